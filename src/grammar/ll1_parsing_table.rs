use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::error::{GrammarError, PredictConflict, TableError};
use crate::Grammar;

/// What table construction does after the first PREDICT conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    #[default]
    FailFast,
    /// Keep going and report every conflict.
    Collect,
}

/// (non-terminal, lookahead) -> production ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LL1ParsingTable {
    pub(crate) entries: BTreeMap<(usize, usize), usize>,
}

impl LL1ParsingTable {
    pub fn get(&self, non_terminal: usize, lookahead: usize) -> Option<usize> {
        self.entries.get(&(non_terminal, lookahead)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), usize)> + '_ {
        self.entries.iter().map(|(&k, &v)| (k, v))
    }
}

impl Grammar {
    pub fn predict_set(&self, left: usize, alternative: usize) -> Result<BTreeSet<usize>, GrammarError> {
        let production = self
            .alternatives_of(left)?
            .get(alternative)
            .ok_or_else(|| GrammarError::UndefinedSymbol(format!(
                "{} alternative {}",
                self.get_symbol_name(left),
                alternative
            )))?;

        let mut predict = self.first_of(production)?;
        if self.sequence_derives_to_empty(production)? {
            predict.extend(self.follow_of(left)?);
        }
        Ok(predict)
    }

    pub fn generate_ll1_parsing_table(&self) -> Result<LL1ParsingTable, TableError> {
        self.generate_ll1_parsing_table_with(ConflictPolicy::FailFast)
    }

    pub fn generate_ll1_parsing_table_with(
        &self,
        policy: ConflictPolicy,
    ) -> Result<LL1ParsingTable, TableError> {
        let mut table = LL1ParsingTable::default();
        let mut conflicts: Vec<PredictConflict> = Vec::new();

        for (p, _) in self.productions() {
            for t in self.predict_set(p.left, p.alternative)? {
                match table.entries.get(&(p.left, t)) {
                    Some(&existing) if existing != p.ordinal => {
                        let conflict = PredictConflict {
                            non_terminal: self.get_symbol_name(p.left).to_string(),
                            terminal: self.get_symbol_name(t).to_string(),
                            first: existing,
                            second: p.ordinal,
                        };
                        warn!("{}", conflict);
                        conflicts.push(conflict);
                        if policy == ConflictPolicy::FailFast {
                            return Err(TableError::Conflicts(conflicts));
                        }
                    }
                    Some(_) => {}
                    None => {
                        table.entries.insert((p.left, t), p.ordinal);
                    }
                }
            }
        }

        if !conflicts.is_empty() {
            return Err(TableError::Conflicts(conflicts));
        }
        debug!("LL(1) table built with {} entries", table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn predict_names(g: &Grammar, left: &str, alternative: usize) -> Vec<String> {
        let set = g.predict_set(g.symbol(left).unwrap(), alternative).unwrap();
        g.names(&set).into_iter().map(String::from).collect()
    }

    #[test]
    fn balanced_grammar_is_ll1() {
        let g = Grammar::parse("S -> a S b | lambda").unwrap();
        let s = g.symbol("S").unwrap();

        assert_eq!(predict_names(&g, "S", 0), vec!["a"]);
        assert_eq!(g.predict_set(s, 1).unwrap(), g.follow_of(s).unwrap());
        assert_eq!(predict_names(&g, "S", 1), vec!["$", "b"]);

        let table = g.generate_ll1_parsing_table().unwrap();
        let a = g.symbol("a").unwrap();
        let b = g.symbol("b").unwrap();
        assert_eq!(table.get(s, a), Some(1));
        assert_eq!(table.get(s, b), Some(2));
        assert_eq!(table.get(s, g.end_mark()), Some(2));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn ambiguous_grammar_conflicts() {
        let g = Grammar::parse("S -> a | a b").unwrap();
        let err = g.generate_ll1_parsing_table().unwrap_err();
        assert_eq!(
            err,
            TableError::Conflicts(vec![PredictConflict {
                non_terminal: "S".to_string(),
                terminal: "a".to_string(),
                first: 1,
                second: 2,
            }])
        );
    }

    #[test]
    fn collect_reports_every_conflict() {
        let g = Grammar::parse("S -> A | B\nA -> x | y\nB -> x | y").unwrap();

        match g.generate_ll1_parsing_table().unwrap_err() {
            TableError::Conflicts(conflicts) => assert_eq!(conflicts.len(), 1),
            e => panic!("unexpected {:?}", e),
        }

        match g.generate_ll1_parsing_table_with(ConflictPolicy::Collect).unwrap_err() {
            TableError::Conflicts(conflicts) => {
                let cells: Vec<(&str, &str)> = conflicts
                    .iter()
                    .map(|c| (c.non_terminal.as_str(), c.terminal.as_str()))
                    .collect();
                assert_eq!(cells, vec![("S", "x"), ("S", "y")]);
            }
            e => panic!("unexpected {:?}", e),
        }
    }

    #[test]
    fn expression_grammar_table() {
        let g = Grammar::parse(
            "E -> T E'
             E' -> + T E' | lambda
             T -> F T'
             T' -> * F T' | lambda
             F -> ( E ) | id",
        )
        .unwrap();
        let table = g.generate_ll1_parsing_table().unwrap();

        let cell = |nt: &str, t: &str| table.get(g.symbol(nt).unwrap(), g.symbol(t).unwrap());
        // Ordinals: E=1, E'=2,3, F=4,5, T=6, T'=7,8
        assert_eq!(cell("E", "id"), Some(1));
        assert_eq!(cell("E", "+"), None);
        assert_eq!(cell("E'", "+"), Some(2));
        assert_eq!(cell("E'", ")"), Some(3));
        assert_eq!(cell("E'", "$"), Some(3));
        assert_eq!(cell("F", "("), Some(4));
        assert_eq!(cell("F", "id"), Some(5));
        assert_eq!(cell("T'", "+"), Some(8));
        assert_eq!(cell("T'", "*"), Some(7));
    }

    #[test]
    fn nullable_alternative_without_epsilon_uses_follow() {
        let g = Grammar::parse("S -> A c\nA -> B B | a\nB -> lambda").unwrap();
        assert_eq!(predict_names(&g, "A", 0), vec!["c"]);
        assert_eq!(predict_names(&g, "A", 1), vec!["a"]);
    }

    #[test]
    fn predict_of_missing_alternative() {
        let g = Grammar::parse("S -> a").unwrap();
        assert!(g.predict_set(g.symbol("S").unwrap(), 3).is_err());
        assert!(g.predict_set(g.symbol("a").unwrap(), 0).is_err());
    }
}
