extern crate wasm_bindgen;

use wasm_bindgen::prelude::*;

pub mod error;
pub mod grammar;

pub use error::{Expected, GrammarError, InternalError, ParseError, PredictConflict, TableError};
pub use grammar::ll1_parser::{ParseTree, ParseTreeNode};
pub use grammar::ll1_parsing_table::{ConflictPolicy, LL1ParsingTable};
pub use grammar::token::{Token, TokenStream};
pub use grammar::Grammar;

fn error_json(e: impl std::fmt::Display) -> String {
    serde_json::json!({ "error": e.to_string() }).to_string()
}

#[wasm_bindgen]
pub fn nullable_first_follow_to_json(grammar: &str) -> String {
    let g = match Grammar::parse(grammar) {
        Ok(g) => g,
        Err(e) => return error_json(e),
    };
    match g.to_non_terminal_output_vec() {
        Ok(t) => t.to_json().unwrap_or_else(error_json),
        Err(e) => error_json(e),
    }
}

#[wasm_bindgen]
pub fn ll1_parsing_table_to_json(grammar: &str) -> String {
    let g = match Grammar::parse(grammar) {
        Ok(g) => g,
        Err(e) => return error_json(e),
    };
    match g.to_ll1_parsing_table_output() {
        Ok(t) => serde_json::to_string(&t).unwrap_or_else(error_json),
        Err(e) => error_json(e),
    }
}

/// `tokens` holds one `kind [lexeme]` per line.
#[wasm_bindgen]
pub fn ll1_parse_to_json(grammar: &str, tokens: &str) -> String {
    let g = match Grammar::parse(grammar) {
        Ok(g) => g,
        Err(e) => return error_json(e),
    };
    let table = match g.generate_ll1_parsing_table() {
        Ok(table) => table,
        Err(e) => return error_json(e),
    };
    match g.ll1_parse(&table, &mut TokenStream::parse(tokens)) {
        Ok(tree) => serde_json::to_string(&tree.to_output(&g)).unwrap_or_else(error_json),
        Err(e) => error_json(e),
    }
}


#[cfg(test)]
mod json_tests {
    use pretty_assertions::assert_eq;

    #[test]
    fn nullable_first_follow_json() {
        let json = crate::nullable_first_follow_to_json("S -> a S | lambda");
        assert_eq!(
            json,
            r#"{"data":[{"name":"S","nullable":true,"first":["a"],"follow":["$"]}]}"#
        );
    }

    #[test]
    fn errors_are_json() {
        let json = crate::nullable_first_follow_to_json("S a -> b");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["error"], "Line 1: left side contains whitespace");

        let json = crate::ll1_parse_to_json("S -> a | a b", "a\n$");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["error"].as_str().unwrap().starts_with("grammar is not LL(1)"));
    }

    #[test]
    fn parse_json() {
        let json = crate::ll1_parse_to_json("S -> a S | lambda", "a one\n$");
        assert_eq!(
            json,
            r#"{"symbol":"S","children":[{"symbol":"a","lexeme":"one"},{"symbol":"S","children":[{"symbol":"lambda"}]}]}"#
        );
    }
}
