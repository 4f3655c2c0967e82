use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("'{0}' is not defined in the grammar")]
    UndefinedSymbol(String),
    #[error("'{0}' is declared as both a terminal and a non-terminal")]
    TerminalNonTerminal(String),
    #[error("'{0}' has productions but is not a non-terminal")]
    NotANonTerminal(String),
    #[error("the grammar has no start symbol")]
    MissingStartSymbol,
    #[error("both '{0}' and '{1}' produce the end marker; the start symbol must be unique")]
    MultipleStartSymbols(String, String),
    #[error("set computation did not settle within {limit} rounds")]
    TooComplex { limit: usize },
}

/// Two productions of the same non-terminal predict the same lookahead.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("conflict at ({non_terminal}, {terminal}): productions {first} and {second}")]
pub struct PredictConflict {
    pub non_terminal: String,
    pub terminal: String,
    pub first: usize,
    pub second: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error("grammar is not LL(1): {}", .0.iter().map(|c| c.to_string()).collect::<Vec<_>>().join("; "))]
    Conflicts(Vec<PredictConflict>),
}

/// What the parser was looking for when it rejected a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Expected {
    /// No table entry predicts a production of this non-terminal.
    NonTerminal(String),
    /// The top of the stack is this terminal (or `$`).
    Terminal(String),
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::NonTerminal(name) => write!(f, "a token in the predict set of {}", name),
            Expected::Terminal(name) => write!(f, "'{}'", name),
        }
    }
}

/// Broken engine invariants. These never come from bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("symbol stack emptied before the end marker was matched")]
    StackUnderflow,
    #[error("tried to ascend above the parse tree root")]
    AscendPastRoot,
    #[error("stack holds unknown symbol #{0}")]
    UnknownSymbol(usize),
    #[error("table refers to unknown production {0}")]
    UnknownProduction(usize),
    #[error("parse finished away from the parse tree root")]
    UnbalancedTree,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("token {position}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        position: usize,
        expected: Expected,
        found: String,
    },
    #[error("internal parser error: {0}")]
    Internal(#[from] InternalError),
}
