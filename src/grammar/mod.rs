pub mod grammar;
pub mod ll1_parser;
pub mod ll1_parsing_table;
pub mod lr_dfa;
pub mod nullable_first_follow;
pub mod parse;
pub mod pretty_print;
pub mod token;
pub use grammar::{Grammar, GrammarBuilder, ProductionRef, Symbol};

pub const EPSILON: &str = "lambda";
pub const EPSILON_ALIASES: [&str; 2] = ["ε", "ϵ"];
pub const END_MARK: &str = "$";
