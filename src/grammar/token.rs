use serde::Serialize;

use super::END_MARK;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Must name a terminal of the grammar, or be `$`.
    pub kind: String,
    pub lexeme: Option<String>,
}

impl Token {
    pub fn new(kind: &str, lexeme: Option<&str>) -> Self {
        Self {
            kind: kind.to_string(),
            lexeme: lexeme.map(|s| s.to_string()),
        }
    }

    pub fn end_mark() -> Self {
        Self::new(END_MARK, None)
    }

    pub fn is_end_mark(&self) -> bool {
        self.kind == END_MARK
    }
}

/// A cursor over a token sequence. Once the tokens run out it keeps
/// yielding the end marker.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    position: usize,
    end: Token,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            end: Token::end_mark(),
        }
    }

    /// One token per non-blank line: `kind [lexeme]`.
    pub fn parse(input: &str) -> Self {
        let tokens = input
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                let mut parts = line.splitn(2, char::is_whitespace);
                let kind = parts.next().filter(|k| !k.is_empty())?;
                let lexeme = parts.next().map(str::trim).filter(|l| !l.is_empty());
                Some(Token::new(kind, lexeme))
            })
            .collect();
        Self::new(tokens)
    }

    /// Tokens consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.tokens.len()
    }

    pub fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&self.end)
    }

    pub fn pop(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_exhausted() {
            self.position += 1;
        }
        token
    }
}
