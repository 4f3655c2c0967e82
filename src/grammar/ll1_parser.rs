use log::{debug, trace};

use super::grammar::{Symbol, END_MARK_IDX, EPSILON_IDX};
use super::ll1_parsing_table::LL1ParsingTable;
use super::token::{Token, TokenStream};
use crate::error::{Expected, InternalError, ParseError};
use crate::Grammar;

pub type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTreeNode {
    /// `None` only for the synthetic root.
    pub symbol: Option<usize>,
    /// The consumed token, for terminal and end-marker leaves.
    pub token: Option<Token>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Nodes live in one vector; `children` own the structure top-down and
/// `parent` is only a link back up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    nodes: Vec<ParseTreeNode>,
}

impl ParseTree {
    fn new() -> Self {
        Self {
            nodes: vec![ParseTreeNode {
                symbol: None,
                token: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    fn push(&mut self, parent: NodeId, symbol: usize, token: Option<Token>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(ParseTreeNode {
            symbol: Some(symbol),
            token,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// The synthetic root.
    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// The start symbol's node, the root's only child.
    pub fn start(&self) -> Option<NodeId> {
        self.nodes[ROOT].children.first().copied()
    }

    pub fn node(&self, id: NodeId) -> &ParseTreeNode {
        &self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackEntry {
    Symbol(usize),
    Epsilon,
    /// Children of the current node are done; move back up.
    Ascend,
}

fn lookahead(g: &Grammar, tokens: &TokenStream) -> Option<usize> {
    g.get_symbol_index(&tokens.peek().kind)
        .filter(|&t| g.symbols[t].is_literal())
}

fn unexpected(tokens: &TokenStream, expected: Expected) -> ParseError {
    ParseError::UnexpectedToken {
        position: tokens.position(),
        expected,
        found: tokens.peek().kind.clone(),
    }
}

/// Table-driven LL(1) parse of `tokens` from `start_symbol`.
pub fn parse(
    g: &Grammar,
    table: &LL1ParsingTable,
    start_symbol: usize,
    tokens: &mut TokenStream,
) -> Result<ParseTree, ParseError> {
    let mut stack = vec![
        StackEntry::Symbol(END_MARK_IDX),
        StackEntry::Symbol(start_symbol),
    ];
    let mut tree = ParseTree::new();
    let mut current = ROOT;
    let mut accepted = false;

    while let Some(entry) = stack.pop() {
        trace!("{:?} at token {} ({:?})", entry, tokens.position(), tokens.peek().kind);
        match entry {
            StackEntry::Ascend => {
                current = tree.parent(current).ok_or(InternalError::AscendPastRoot)?;
            }
            StackEntry::Epsilon => {
                tree.push(current, EPSILON_IDX, None);
            }
            StackEntry::Symbol(x) => match g.symbols.get(x) {
                None => return Err(InternalError::UnknownSymbol(x).into()),
                Some(Symbol::Epsilon) => {
                    tree.push(current, EPSILON_IDX, None);
                }
                Some(Symbol::NonTerminal(nt)) => {
                    let ordinal = lookahead(g, tokens)
                        .and_then(|t| table.get(x, t))
                        .ok_or_else(|| unexpected(tokens, Expected::NonTerminal(nt.name.clone())))?;
                    let (p, right) = g
                        .production(ordinal)
                        .filter(|(p, _)| p.left == x)
                        .ok_or(InternalError::UnknownProduction(ordinal))?;
                    trace!("expand {} by production {}", nt.name, p.ordinal);

                    stack.push(StackEntry::Ascend);
                    stack.extend(right.iter().rev().map(|&s| {
                        if s == EPSILON_IDX {
                            StackEntry::Epsilon
                        } else {
                            StackEntry::Symbol(s)
                        }
                    }));
                    current = tree.push(current, x, None);
                }
                Some(_) => {
                    if lookahead(g, tokens) != Some(x) {
                        return Err(unexpected(
                            tokens,
                            Expected::Terminal(g.get_symbol_name(x).to_string()),
                        ));
                    }
                    let token = tokens.pop();
                    if x == END_MARK_IDX && current == ROOT {
                        // Bottom of the stack: no leaf, the root keeps one child.
                        accepted = true;
                    } else {
                        tree.push(current, x, Some(token));
                    }
                }
            },
        }
    }

    if !accepted {
        return Err(InternalError::StackUnderflow.into());
    }
    if current != ROOT || tree.start().is_none() {
        return Err(InternalError::UnbalancedTree.into());
    }
    if !tokens.is_exhausted() {
        return Err(unexpected(tokens, Expected::Terminal(g.get_symbol_name(END_MARK_IDX).to_string())));
    }

    debug!("parsed {} tokens into {} nodes", tokens.position(), tree.len());
    Ok(tree)
}

impl Grammar {
    /// [`parse`] from the grammar's start symbol.
    pub fn ll1_parse(&self, table: &LL1ParsingTable, tokens: &mut TokenStream) -> Result<ParseTree, ParseError> {
        parse(self, table, self.start_symbol, tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(kinds: &str) -> TokenStream {
        TokenStream::new(kinds.split_whitespace().map(|k| Token::new(k, None)).collect())
    }

    fn parse_text(grammar: &str, input: &str) -> (Grammar, Result<ParseTree, ParseError>) {
        let g = Grammar::parse(grammar).unwrap();
        let table = g.generate_ll1_parsing_table().unwrap();
        let result = g.ll1_parse(&table, &mut tokens(input));
        (g, result)
    }

    #[test]
    fn balanced_input_parses() {
        let (g, tree) = parse_text("S -> a S b | lambda", "a a b b $");
        let tree = tree.unwrap();
        assert_eq!(tree.to_plaintext(&g), "S(a S(a S(lambda) b) b)");

        let start = tree.start().unwrap();
        assert_eq!(tree.children(tree.root()), &[start]);
        assert_eq!(tree.node(start).symbol, Some(g.symbol("S").unwrap()));
        assert_eq!(tree.parent(start), Some(tree.root()));
        for &child in tree.children(start) {
            assert_eq!(tree.parent(child), Some(start));
        }
    }

    #[test]
    fn missing_prediction_fails() {
        let (_, result) = parse_text("S -> a S b | lambda", "a c $");
        assert_eq!(
            result.unwrap_err(),
            ParseError::UnexpectedToken {
                position: 1,
                expected: Expected::NonTerminal("S".to_string()),
                found: "c".to_string(),
            }
        );
    }

    #[test]
    fn terminal_mismatch_fails() {
        let (_, result) = parse_text("S -> a b", "a a $");
        assert_eq!(
            result.unwrap_err(),
            ParseError::UnexpectedToken {
                position: 1,
                expected: Expected::Terminal("b".to_string()),
                found: "a".to_string(),
            }
        );
    }

    #[test]
    fn trailing_input_fails() {
        let (_, result) = parse_text("S -> a", "a a $");
        assert_eq!(
            result.unwrap_err(),
            ParseError::UnexpectedToken {
                position: 1,
                expected: Expected::Terminal("$".to_string()),
                found: "a".to_string(),
            }
        );
    }

    #[test]
    fn implicit_end_of_input() {
        let (g, tree) = parse_text("S -> a S b | lambda", "a b");
        assert_eq!(tree.unwrap().to_plaintext(&g), "S(a S(lambda) b)");
    }

    #[test]
    fn end_marker_in_start_production() {
        let (g, tree) = parse_text("S -> A $\nA -> a A | lambda", "a a $");
        assert_eq!(tree.unwrap().to_plaintext(&g), "S(A(a A(a A(lambda))) $)");
    }

    #[test]
    fn unknown_token_kind() {
        let (_, result) = parse_text("S -> a", "zzz $");
        assert_eq!(
            result.unwrap_err(),
            ParseError::UnexpectedToken {
                position: 0,
                expected: Expected::NonTerminal("S".to_string()),
                found: "zzz".to_string(),
            }
        );
    }

    #[test]
    fn leaves_keep_lexemes() {
        let g = Grammar::parse(
            "E -> T E'
             E' -> + T E' | lambda
             T -> F T'
             T' -> * F T' | lambda
             F -> ( E ) | id",
        )
        .unwrap();
        let table = g.generate_ll1_parsing_table().unwrap();
        let mut ts = TokenStream::parse("id x\n+\nid y\n*\nid z\n$");
        let tree = g.ll1_parse(&table, &mut ts).unwrap();

        assert_eq!(
            tree.to_plaintext(&g),
            "E(T(F(id) T'(lambda)) E'(+ T(F(id) T'(* F(id) T'(lambda))) E'(lambda)))"
        );
        let lexemes: Vec<&str> = (0..tree.len())
            .filter_map(|id| tree.node(id).token.as_ref())
            .filter_map(|t| t.lexeme.as_deref())
            .collect();
        assert_eq!(lexemes, vec!["x", "y", "z"]);
    }

    #[test]
    fn bad_table_is_an_internal_error() {
        let g = Grammar::parse("S -> a").unwrap();
        let mut table = g.generate_ll1_parsing_table().unwrap();
        let s = g.symbol("S").unwrap();
        let a = g.symbol("a").unwrap();
        table.entries.insert((s, a), 42);
        assert_eq!(
            g.ll1_parse(&table, &mut tokens("a $")).unwrap_err(),
            ParseError::Internal(InternalError::UnknownProduction(42))
        );
    }
}
