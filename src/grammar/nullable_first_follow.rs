use std::collections::BTreeSet;

use log::{debug, trace};

use super::grammar::{Symbol, END_MARK_IDX, EPSILON_IDX};
use super::Grammar;
use crate::error::GrammarError;

/// Nullable, FIRST and FOLLOW for every symbol, indexed like the grammar's
/// symbol list. Entries for anything but non-terminals are left empty
/// (epsilon is the only nullable non-non-terminal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullableFirstFollow {
    pub nullable: Vec<bool>,
    pub first: Vec<BTreeSet<usize>>,
    pub follow: Vec<BTreeSet<usize>>,
}

impl NullableFirstFollow {
    pub(crate) fn compute(g: &Grammar) -> Result<Self, GrammarError> {
        let n = g.symbols.len();
        // Every productive round adds at least one element somewhere.
        let limit = g.production_refs.len() * n + 1;

        let mut sets = Self {
            nullable: vec![false; n],
            first: vec![BTreeSet::new(); n],
            follow: vec![BTreeSet::new(); n],
        };
        sets.nullable[EPSILON_IDX] = true;
        sets.follow[g.start_symbol].insert(END_MARK_IDX);

        sets.calculate_nullable(g, limit)?;
        sets.calculate_first(g, limit)?;
        sets.calculate_follow(g, limit)?;
        Ok(sets)
    }

    fn sequence_nullable(&self, g: &Grammar, sequence: &[usize]) -> bool {
        !g.contains_literal_terminal(sequence) && sequence.iter().all(|&s| self.nullable[s])
    }

    fn calculate_nullable(&mut self, g: &Grammar, limit: usize) -> Result<(), GrammarError> {
        let mut rounds = 0;
        let mut changed = true;
        while changed {
            rounds += 1;
            if rounds > limit {
                return Err(GrammarError::TooComplex { limit });
            }
            changed = false;
            for nt in g.non_terminal_iter() {
                if self.nullable[nt.index] {
                    continue;
                }
                if nt
                    .productions
                    .iter()
                    .any(|production| self.sequence_nullable(g, production))
                {
                    trace!("{} derives to empty", nt.name);
                    self.nullable[nt.index] = true;
                    changed = true;
                }
            }
        }
        debug!("nullable settled after {} rounds", rounds);
        Ok(())
    }

    pub(crate) fn first_of_sequence(&self, g: &Grammar, sequence: &[usize]) -> BTreeSet<usize> {
        let mut first = BTreeSet::new();
        for &idx in sequence {
            match &g.symbols[idx] {
                Symbol::Terminal(_) | Symbol::EndMarker => {
                    first.insert(idx);
                    break;
                }
                Symbol::Epsilon => continue,
                Symbol::NonTerminal(_) => {
                    first.extend(self.first[idx].iter().cloned());
                    if !self.nullable[idx] {
                        break;
                    }
                }
            }
        }
        first
    }

    fn calculate_first(&mut self, g: &Grammar, limit: usize) -> Result<(), GrammarError> {
        let mut rounds = 0;
        let mut changed = true;
        while changed {
            rounds += 1;
            if rounds > limit {
                return Err(GrammarError::TooComplex { limit });
            }
            changed = false;
            for nt in g.non_terminal_iter() {
                let first = nt
                    .productions
                    .iter()
                    .fold(BTreeSet::new(), |mut first, production| {
                        first.extend(self.first_of_sequence(g, production));
                        first
                    });

                // Sets only grow, so a size change is a content change.
                if first.len() != self.first[nt.index].len() {
                    trace!("FIRST({}) grew to {} symbols", nt.name, first.len());
                    self.first[nt.index] = first;
                    changed = true;
                }
            }
        }
        debug!("FIRST settled after {} rounds", rounds);
        Ok(())
    }

    fn calculate_follow(&mut self, g: &Grammar, limit: usize) -> Result<(), GrammarError> {
        let mut rounds = 0;
        let mut changed = true;
        while changed {
            rounds += 1;
            if rounds > limit {
                return Err(GrammarError::TooComplex { limit });
            }
            changed = false;
            for left in g.non_terminal_iter() {
                for production in &left.productions {
                    for (i, &symbol) in production.iter().enumerate() {
                        if !g.is_non_terminal(symbol) {
                            continue;
                        }

                        let trailing = &production[i + 1..];
                        let mut follow = self.first_of_sequence(g, trailing);
                        if self.sequence_nullable(g, trailing) {
                            follow.extend(self.follow[left.index].iter().cloned());
                        }

                        let before = self.follow[symbol].len();
                        self.follow[symbol].extend(follow);
                        if self.follow[symbol].len() != before {
                            changed = true;
                        }
                    }
                }
            }
        }
        debug!("FOLLOW settled after {} rounds", rounds);
        Ok(())
    }
}

impl Grammar {
    /// The cached set tables, computed on the first call.
    pub fn nullable_first_follow(&self) -> Result<&NullableFirstFollow, GrammarError> {
        self.sets
            .get_or_init(|| NullableFirstFollow::compute(self))
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn derives_to_empty(&self, symbol: usize) -> Result<bool, GrammarError> {
        self.check_index(symbol)?;
        Ok(self.nullable_first_follow()?.nullable[symbol])
    }

    /// True if every symbol of `sequence` derives to empty. A terminal or the
    /// end marker anywhere in the sequence makes this false.
    pub fn sequence_derives_to_empty(&self, sequence: &[usize]) -> Result<bool, GrammarError> {
        for &s in sequence {
            self.check_index(s)?;
        }
        Ok(self.nullable_first_follow()?.sequence_nullable(self, sequence))
    }

    pub fn first_of(&self, sequence: &[usize]) -> Result<BTreeSet<usize>, GrammarError> {
        for &s in sequence {
            self.check_index(s)?;
        }
        Ok(self.nullable_first_follow()?.first_of_sequence(self, sequence))
    }

    pub fn follow_of(&self, non_terminal: usize) -> Result<BTreeSet<usize>, GrammarError> {
        self.alternatives_of(non_terminal)?;
        Ok(self.nullable_first_follow()?.follow[non_terminal].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn first_names(g: &Grammar, sequence: &[&str]) -> Vec<String> {
        let sequence: Vec<usize> = sequence.iter().map(|s| g.symbol(s).unwrap()).collect();
        let first = g.first_of(&sequence).unwrap();
        g.names(&first).into_iter().map(String::from).collect()
    }

    fn follow_names(g: &Grammar, nt: &str) -> Vec<String> {
        let follow = g.follow_of(g.symbol(nt).unwrap()).unwrap();
        g.names(&follow).into_iter().map(String::from).collect()
    }

    const EXPRESSION: &str = "
        E -> T E'
        E' -> + T E' | lambda
        T -> F T'
        T' -> * F T' | lambda
        F -> ( E ) | id
    ";

    #[test]
    fn nullable_chain_both_directions() {
        let g = Grammar::parse(
            "S -> A D $
             A -> B | x
             B -> C
             C -> lambda
             D -> D y | E
             E -> C F
             F -> F",
        )
        .unwrap();

        for nt in ["A", "B", "C"] {
            assert!(g.derives_to_empty(g.symbol(nt).unwrap()).unwrap(), "{}", nt);
        }
        for nt in ["S", "D", "E", "F"] {
            assert!(!g.derives_to_empty(g.symbol(nt).unwrap()).unwrap(), "{}", nt);
        }
        assert!(g.derives_to_empty(g.epsilon()).unwrap());
        assert!(!g.derives_to_empty(g.end_mark()).unwrap());
        assert!(!g.derives_to_empty(g.symbol("x").unwrap()).unwrap());
    }

    #[test]
    fn sequence_with_literal_never_vanishes() {
        let g = Grammar::parse("S -> A x\nA -> lambda").unwrap();
        let a = g.symbol("A").unwrap();
        let x = g.symbol("x").unwrap();
        assert!(g.sequence_derives_to_empty(&[a, a]).unwrap());
        assert!(!g.sequence_derives_to_empty(&[a, x]).unwrap());
        assert!(!g.sequence_derives_to_empty(&[a, g.end_mark()]).unwrap());
        assert!(g.sequence_derives_to_empty(&[]).unwrap());
    }

    #[test]
    fn expression_first_sets() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        assert_eq!(first_names(&g, &["E"]), vec!["(", "id"]);
        assert_eq!(first_names(&g, &["T"]), vec!["(", "id"]);
        assert_eq!(first_names(&g, &["E'"]), vec!["+"]);
        assert_eq!(first_names(&g, &["T'"]), vec!["*"]);
        assert_eq!(first_names(&g, &["T'", "E'"]), vec!["*", "+"]);
        assert_eq!(first_names(&g, &["T'", "E'", ")"]), vec![")", "*", "+"]);
    }

    #[test]
    fn expression_follow_sets() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        assert_eq!(follow_names(&g, "E"), vec!["$", ")"]);
        assert_eq!(follow_names(&g, "E'"), vec!["$", ")"]);
        assert_eq!(follow_names(&g, "T"), vec!["$", ")", "+"]);
        assert_eq!(follow_names(&g, "T'"), vec!["$", ")", "+"]);
        assert_eq!(follow_names(&g, "F"), vec!["$", ")", "*", "+"]);
    }

    #[test]
    fn leading_terminal_decides_first() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        assert_eq!(first_names(&g, &["id"]), vec!["id"]);
        assert_eq!(first_names(&g, &["+", "E", "T'"]), vec!["+"]);
        assert_eq!(first_names(&g, &["$", "E"]), vec!["$"]);
    }

    #[test]
    fn epsilon_is_skipped_and_never_in_first() {
        let g = Grammar::parse("S -> A b\nA -> lambda").unwrap();
        assert_eq!(first_names(&g, &["lambda", "b"]), vec!["b"]);
        assert_eq!(first_names(&g, &["A"]), Vec::<String>::new());
        assert_eq!(first_names(&g, &["A", "b"]), vec!["b"]);
        assert_eq!(g.first_of(&[]).unwrap(), BTreeSet::new());
    }

    #[test]
    fn end_marker_is_a_literal() {
        let g = Grammar::parse("S -> A $\nA -> a | lambda").unwrap();
        assert_eq!(first_names(&g, &["S"]), vec!["$", "a"]);
        assert_eq!(follow_names(&g, "A"), vec!["$"]);
        assert_eq!(follow_names(&g, "S"), vec!["$"]);
    }

    #[test]
    fn cyclic_follow_terminates() {
        let g = Grammar::parse("A -> B a\nB -> A").unwrap();
        assert_eq!(follow_names(&g, "A"), vec!["$", "a"]);
        assert_eq!(follow_names(&g, "B"), vec!["a"]);
        assert_eq!(first_names(&g, &["A"]), Vec::<String>::new());
    }

    #[test]
    fn mutual_right_recursion() {
        let g = Grammar::parse("S -> a A\nA -> b B | lambda\nB -> c A").unwrap();
        assert_eq!(follow_names(&g, "A"), vec!["$"]);
        assert_eq!(follow_names(&g, "B"), vec!["$"]);
    }

    #[test]
    fn follow_only_holds_literals() {
        for text in [EXPRESSION, "A -> B a\nB -> A", "S -> A $\nA -> a | lambda"] {
            let g = Grammar::parse(text).unwrap();
            for nt in g.non_terminal_iter() {
                for s in g.follow_of(nt.index).unwrap() {
                    assert!(g.symbols[s].is_literal(), "{} in FOLLOW({})", g.get_symbol_name(s), nt.name);
                }
            }
        }
    }

    #[test]
    fn repeated_queries_hit_the_cache() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        let e = g.symbol("E").unwrap();
        assert_eq!(g.follow_of(e).unwrap(), g.follow_of(e).unwrap());
        assert_eq!(g.first_of(&[e]).unwrap(), g.first_of(&[e]).unwrap());
        assert!(std::ptr::eq(
            g.nullable_first_follow().unwrap(),
            g.nullable_first_follow().unwrap()
        ));
    }

    #[test]
    fn shared_across_threads() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        let f = g.symbol("F").unwrap();
        let results: Vec<BTreeSet<usize>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| g.follow_of(f).unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn undefined_symbols_are_reported() {
        let g = Grammar::parse(EXPRESSION).unwrap();
        let id = g.symbol("id").unwrap();
        assert_eq!(
            g.follow_of(id),
            Err(GrammarError::UndefinedSymbol("id".to_string()))
        );
        assert_eq!(
            g.derives_to_empty(999),
            Err(GrammarError::UndefinedSymbol("#999".to_string()))
        );
        assert!(g.first_of(&[id, 999]).is_err());
    }
}
