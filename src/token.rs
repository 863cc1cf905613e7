use crate::position::Position;
use std::fmt::{Debug, Display, Formatter};

/// The closed set of lexical classes the scanner recognises (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    Identifier,
    Keyword,
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,
    CharLiteral,
    Operator,
    Punctuation,
    Whitespace,
    Comment,
    EndOfInput,
    Invalid,
}

impl TokenKind {
    /// Whitespace and comments carry no grammatical meaning on their own; every
    /// other kind is structural for the purpose of [crate::token_stream::TokenStream]
    /// filtering (spec §3, "Token" and §4.3 adjacency/sequence validators).
    pub fn is_structural(&self) -> bool {
        !matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A parsed literal value extracted from a numeric/string/char token, kept
/// alongside the raw source slice (spec §3, "Token").
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Integer(i64),
    Float(f64),
    Str(String),
    Char(char),
    None,
}

/// A lexeme produced by the [scanner](crate::scanner), owned by its output buffer.
/// The field and periscope only ever hold indices into that buffer, never the
/// token itself (spec §3, "Lifecycles").
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub file_id: u32,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    pub literal: LiteralValue,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        file_id: u32,
        start: usize,
        end: usize,
        position: Position,
        literal: LiteralValue,
    ) -> Self {
        Self {
            kind,
            file_id,
            start,
            end,
            line: position.line,
            column: position.column,
            literal,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'c>(&self, source: &'c [u8]) -> &'c [u8] {
        &source[self.start..self.end]
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}..{}]", self.kind, self.start, self.end)
    }
}
