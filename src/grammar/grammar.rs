use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;

use super::nullable_first_follow::NullableFirstFollow;
use super::{END_MARK, EPSILON, EPSILON_ALIASES};
use crate::error::GrammarError;

pub(crate) const EPSILON_IDX: usize = 0;
pub(crate) const END_MARK_IDX: usize = 1;

#[derive(Debug, Clone)]
pub struct NonTerminal {
    pub index: usize,
    pub name: String,
    pub productions: Vec<Vec<usize>>,
}

impl NonTerminal {
    pub fn new(index: usize, name: String) -> Self {
        Self {
            index,
            name,
            productions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Epsilon,
    EndMarker,
    Terminal(String),
    NonTerminal(NonTerminal),
}

impl Symbol {
    pub fn non_terminal(&self) -> Option<&NonTerminal> {
        match self {
            Symbol::NonTerminal(e) => Some(e),
            _ => None,
        }
    }

    /// Terminals and the end marker: symbols matched directly against input.
    pub fn is_literal(&self) -> bool {
        matches!(self, Symbol::Terminal(_) | Symbol::EndMarker)
    }
}

/// One alternative of one non-terminal.
///
/// `ordinal` is 1-based and follows sorted left-hand-side names, then the
/// declaration order of alternatives, so it is stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProductionRef {
    pub ordinal: usize,
    pub left: usize,
    pub alternative: usize,
}

/// Collects classified symbols and productions, then validates them into a
/// [`Grammar`].
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    symbols: Vec<Symbol>,
    symbol_table: HashMap<String, usize>,
    start_symbol: Option<usize>,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        let mut symbol_table = HashMap::new();
        symbol_table.insert(EPSILON.to_string(), EPSILON_IDX);
        for alias in EPSILON_ALIASES {
            symbol_table.insert(alias.to_string(), EPSILON_IDX);
        }
        symbol_table.insert(END_MARK.to_string(), END_MARK_IDX);

        Self {
            symbols: vec![Symbol::Epsilon, Symbol::EndMarker],
            symbol_table,
            start_symbol: None,
        }
    }

    pub fn get_symbol_index(&self, name: &str) -> Option<usize> {
        self.symbol_table.get(name).cloned()
    }

    /// Returns the existing index if `name` is already a non-terminal.
    pub fn add_non_terminal(&mut self, name: &str) -> Result<usize, GrammarError> {
        if let Some(idx) = self.get_symbol_index(name) {
            return match &self.symbols[idx] {
                Symbol::NonTerminal(_) => Ok(idx),
                _ => Err(GrammarError::TerminalNonTerminal(name.to_string())),
            };
        }
        let idx = self.symbols.len();
        self.symbols
            .push(Symbol::NonTerminal(NonTerminal::new(idx, name.to_string())));
        self.symbol_table.insert(name.to_string(), idx);
        Ok(idx)
    }

    /// Returns the existing index if `name` is already a terminal.
    pub fn add_terminal(&mut self, name: &str) -> Result<usize, GrammarError> {
        if let Some(idx) = self.get_symbol_index(name) {
            return match &self.symbols[idx] {
                Symbol::Terminal(_) => Ok(idx),
                _ => Err(GrammarError::TerminalNonTerminal(name.to_string())),
            };
        }
        let idx = self.symbols.len();
        self.symbols.push(Symbol::Terminal(name.to_string()));
        self.symbol_table.insert(name.to_string(), idx);
        Ok(idx)
    }

    /// An empty `right` is stored as the epsilon alternative.
    pub fn add_production(&mut self, left: usize, right: Vec<usize>) -> Result<(), GrammarError> {
        if let Some(&bad) = right.iter().find(|&&s| s >= self.symbols.len()) {
            return Err(GrammarError::UndefinedSymbol(format!("#{}", bad)));
        }
        let right = if right.is_empty() {
            vec![EPSILON_IDX]
        } else {
            right
        };
        match self.symbols.get(left) {
            Some(Symbol::NonTerminal(_)) => {}
            Some(symbol) => {
                return Err(GrammarError::NotANonTerminal(symbol_name(symbol).to_string()))
            }
            None => return Err(GrammarError::UndefinedSymbol(format!("#{}", left))),
        }
        if let Some(Symbol::NonTerminal(nt)) = self.symbols.get_mut(left) {
            nt.productions.push(right);
        }
        Ok(())
    }

    pub fn set_start_symbol(&mut self, index: usize) -> Result<(), GrammarError> {
        match self.symbols.get(index) {
            Some(Symbol::NonTerminal(_)) => {
                self.start_symbol = Some(index);
                Ok(())
            }
            Some(symbol) => Err(GrammarError::NotANonTerminal(symbol_name(symbol).to_string())),
            None => Err(GrammarError::UndefinedSymbol(format!("#{}", index))),
        }
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        let start_symbol = self.start_symbol.ok_or(GrammarError::MissingStartSymbol)?;

        // A non-terminal without alternatives is only a name: referencing it
        // (or starting from it) is an undefined symbol.
        for symbol in &self.symbols {
            if let Symbol::NonTerminal(nt) = symbol {
                if nt.productions.is_empty() {
                    return Err(GrammarError::UndefinedSymbol(nt.name.clone()));
                }
            }
        }

        let mut non_terminals: Vec<&NonTerminal> =
            self.symbols.iter().filter_map(|s| s.non_terminal()).collect();
        non_terminals.sort_by(|a, b| a.name.cmp(&b.name));

        let mut production_refs = Vec::new();
        for nt in non_terminals {
            for alternative in 0..nt.productions.len() {
                production_refs.push(ProductionRef {
                    ordinal: production_refs.len() + 1,
                    left: nt.index,
                    alternative,
                });
            }
        }

        Ok(Grammar {
            symbols: self.symbols,
            symbol_table: self.symbol_table,
            start_symbol,
            production_refs,
            sets: OnceLock::new(),
        })
    }
}

fn symbol_name(symbol: &Symbol) -> &str {
    match symbol {
        Symbol::Epsilon => EPSILON,
        Symbol::EndMarker => END_MARK,
        Symbol::Terminal(name) => name.as_str(),
        Symbol::NonTerminal(nt) => nt.name.as_str(),
    }
}

/// An immutable context-free grammar.
///
/// Nullable, FIRST and FOLLOW sets are computed on first use and cached for
/// the lifetime of the grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) symbol_table: HashMap<String, usize>,
    pub(crate) start_symbol: usize,
    pub(crate) production_refs: Vec<ProductionRef>,
    pub(crate) sets: OnceLock<Result<NullableFirstFollow, GrammarError>>,
}

impl Grammar {
    pub fn epsilon(&self) -> usize {
        EPSILON_IDX
    }

    pub fn end_mark(&self) -> usize {
        END_MARK_IDX
    }

    pub fn start_symbol(&self) -> usize {
        self.start_symbol
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn terminal_iter(&self) -> impl Iterator<Item = &String> {
        self.symbols.iter().filter_map(|s| {
            if let Symbol::Terminal(name) = s {
                Some(name)
            } else {
                None
            }
        })
    }

    pub fn non_terminal_iter(&self) -> impl Iterator<Item = &NonTerminal> {
        self.symbols.iter().filter_map(|s| s.non_terminal())
    }

    pub fn get_symbol_index(&self, name: &str) -> Option<usize> {
        self.symbol_table.get(name).cloned()
    }

    /// Like [`Grammar::get_symbol_index`], for callers that treat a missing
    /// name as an error.
    pub fn symbol(&self, name: &str) -> Result<usize, GrammarError> {
        self.get_symbol_index(name)
            .ok_or_else(|| GrammarError::UndefinedSymbol(name.to_string()))
    }

    pub fn get_symbol_name(&self, index: usize) -> &str {
        symbol_name(&self.symbols[index])
    }

    pub(crate) fn check_index(&self, index: usize) -> Result<&Symbol, GrammarError> {
        self.symbols
            .get(index)
            .ok_or_else(|| GrammarError::UndefinedSymbol(format!("#{}", index)))
    }

    pub fn is_terminal(&self, index: usize) -> bool {
        matches!(self.symbols.get(index), Some(Symbol::Terminal(_)))
    }

    pub fn is_non_terminal(&self, index: usize) -> bool {
        matches!(self.symbols.get(index), Some(Symbol::NonTerminal(_)))
    }

    /// True if any symbol of `sequence` is a terminal or the end marker.
    pub fn contains_literal_terminal(&self, sequence: &[usize]) -> bool {
        sequence
            .iter()
            .any(|&s| self.symbols.get(s).map_or(false, Symbol::is_literal))
    }

    pub fn alternatives_of(&self, non_terminal: usize) -> Result<&[Vec<usize>], GrammarError> {
        match self.check_index(non_terminal)? {
            Symbol::NonTerminal(nt) => Ok(&nt.productions),
            symbol => Err(GrammarError::UndefinedSymbol(symbol_name(symbol).to_string())),
        }
    }

    fn production_right(&self, p: ProductionRef) -> Option<&[usize]> {
        self.symbols[p.left]
            .non_terminal()?
            .productions
            .get(p.alternative)
            .map(|right| right.as_slice())
    }

    /// Every production in ordinal order.
    pub fn productions(&self) -> impl Iterator<Item = (ProductionRef, &[usize])> + '_ {
        self.production_refs
            .iter()
            .filter_map(move |&p| self.production_right(p).map(|right| (p, right)))
    }

    pub fn production(&self, ordinal: usize) -> Option<(ProductionRef, &[usize])> {
        let p = *self.production_refs.get(ordinal.checked_sub(1)?)?;
        self.production_right(p).map(|right| (p, right))
    }

    pub fn production_ref(&self, left: usize, alternative: usize) -> Result<ProductionRef, GrammarError> {
        let alternatives = self.alternatives_of(left)?;
        if alternative >= alternatives.len() {
            return Err(GrammarError::UndefinedSymbol(format!(
                "{} alternative {}",
                self.get_symbol_name(left),
                alternative
            )));
        }
        self.production_refs
            .iter()
            .find(|p| p.left == left && p.alternative == alternative)
            .copied()
            .ok_or_else(|| GrammarError::UndefinedSymbol(self.get_symbol_name(left).to_string()))
    }

    pub fn production_to_vec_str(&self, production: &[usize]) -> Vec<&str> {
        production
            .iter()
            .map(|&idx| self.get_symbol_name(idx))
            .collect()
    }

    /// Sorted names of a set of symbol indices.
    pub fn names<'a>(&self, set: impl IntoIterator<Item = &'a usize>) -> Vec<&str> {
        let mut names: Vec<&str> = set.into_iter().map(|&i| self.get_symbol_name(i)).collect();
        names.sort();
        names
    }
}
