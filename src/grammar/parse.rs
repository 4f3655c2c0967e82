use super::grammar::{GrammarBuilder, END_MARK_IDX, EPSILON_IDX};
use crate::error::GrammarError;
use crate::Grammar;

fn syntax(line: usize, message: &str) -> GrammarError {
    GrammarError::Syntax {
        line,
        message: message.to_string(),
    }
}

impl Grammar {
    /// Reads `A -> x B | y` style rules, one left side per line, with `|`
    /// continuation lines. Every left side is a non-terminal and every other
    /// name is a terminal; `lambda` is the empty production and `$` the end
    /// of input. The left side whose rule mentions `$` is the start symbol,
    /// otherwise the first left side is.
    pub fn parse(grammar: &str) -> Result<Self, GrammarError> {
        let mut g = GrammarBuilder::new();

        let mut raw_productions: Vec<(usize, &str, &str)> = Vec::new();

        let mut previous_left: Option<(usize, &str)> = None;
        for (i, line) in grammar.lines().enumerate() {
            if line.chars().all(|c| c.is_whitespace()) {
                continue;
            }
            let parts: Vec<&str> = line.split("->").collect();
            if parts.len() > 2 {
                return Err(syntax(i + 1, "too many \"->\""));
            }
            let (left, left_str, rights): (usize, &str, &str) = if parts.len() == 2 {
                let left_str = parts[0].trim();
                if left_str.is_empty() {
                    return Err(syntax(i + 1, "empty left side"));
                } else if left_str.split_whitespace().count() != 1 {
                    return Err(syntax(i + 1, "left side contains whitespace"));
                }
                match g.get_symbol_index(left_str) {
                    Some(EPSILON_IDX) | Some(END_MARK_IDX) => {
                        return Err(syntax(i + 1, "reserved symbol on the left side"));
                    }
                    _ => (g.add_non_terminal(left_str)?, left_str, parts[1].trim()),
                }
            } else {
                match (previous_left, parts[0].trim().strip_prefix('|')) {
                    (Some((idx, name)), Some(rest)) => (idx, name, rest.trim()),
                    (None, _) => return Err(syntax(i + 1, "cannot find left side")),
                    (Some(_), None) => return Err(syntax(i + 1, "expected \"->\" or \"|\"")),
                }
            };

            previous_left = Some((left, left_str));

            raw_productions.push((left, left_str, rights));
        }

        let mut start_symbol: Option<(usize, &str)> = None;
        for &(left, left_str, rights) in &raw_productions {
            for right in rights.split('|') {
                let mut symbols = Vec::new();
                for s in right.split_whitespace() {
                    let idx = match g.get_symbol_index(s) {
                        Some(idx) => idx,
                        None => g.add_terminal(s)?,
                    };
                    if idx == END_MARK_IDX {
                        match start_symbol {
                            Some((prev, prev_str)) if prev != left => {
                                return Err(GrammarError::MultipleStartSymbols(
                                    prev_str.to_string(),
                                    left_str.to_string(),
                                ));
                            }
                            _ => start_symbol = Some((left, left_str)),
                        }
                    }
                    symbols.push(idx);
                }
                g.add_production(left, symbols)?;
            }
        }

        let start_symbol = start_symbol.or_else(|| raw_productions.first().map(|&(l, s, _)| (l, s)));
        if let Some((idx, _)) = start_symbol {
            g.set_start_symbol(idx)?;
        }

        g.build()
    }
}
