//! Single-pass lexical scanner (spec §4.1).
//!
//! The scanner is hand-written rather than built from composable lexeme
//! combinators: this language's lexical grammar is fixed, so a single
//! maximal-munch state machine does the job in one O(n) pass. The inner grammar
//! of numeric literals (optional fractional part, optional exponent) is matched
//! with a compiled [regex::bytes::Regex] exactly the way the teacher library
//! matches a lexeme's inner pattern.

use crate::code::Code;
use crate::log::Log;
use crate::token::{LiteralValue, Token, TokenKind};
use once_cell::sync::Lazy;
use regex::bytes::Regex;

static NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]+(\.[0-9]+)?").expect("number pattern is valid regex")
});

const KEYWORDS: &[&str] = &[
    "region", "regime", "func", "fn", "var", "const", "if", "else", "while", "for", "return",
    "break", "continue", "collapse", "superpose", "periscope", "fifo", "filo", "seq", "rand",
    "int", "float", "bool", "string", "char", "true", "false", "null",
];

/// Three-, two-, and one-character operator tables, longest first so maximal
/// munch only has to probe in descending length order.
const OPERATORS_3: &[&str] = &["<<=", ">>="];
const OPERATORS_2: &[&str] = &[
    "++", "--", "&&", "||", "==", "<=", ">=", "!=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
    "<<", ">>", "->",
];
const OPERATORS_1: &[&str] = &[
    "+", "-", "*", "/", "%", "=", "<", ">", "!", "&", "|", "^", "~",
];

const PUNCTUATION: &[u8] = b"(){}[];,@";

/// Stateless scanner: every call to [Scanner::scan] owns its own pointer and
/// token buffer, so a single instance can be reused across compiles.
#[derive(Default)]
pub struct Scanner {
    debug: Option<Log<&'static str>>,
}

impl Scanner {
    pub fn new() -> Self {
        Self { debug: None }
    }

    pub fn with_log(mut self, log: Log<&'static str>) -> Self {
        self.debug = Some(log);
        self
    }

    /// Transform `code` into a finite ordered sequence of tokens. Always returns
    /// `Ok`: unrecognised bytes become a single `invalid` token and scanning
    /// resumes at the next byte (spec §4.1, "Errors").
    pub fn scan(&self, code: &Code) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut pointer = 0usize;
        let len = code.len();

        while pointer < len {
            let (kind, end, literal) = self.lex_one(code, pointer);
            let position = code.position_at(pointer);
            #[cfg(debug_assertions)]
            if let Some(log) = &self.debug {
                const VERBOSE_ORDER: u8 = 4;
                if log.order() >= VERBOSE_ORDER {
                    println!("[{}] scanned {:?} @ {}", log, kind, position);
                }
            }
            tokens.push(Token::new(kind, code.file_id, pointer, end, position, literal));
            debug_assert!(end > pointer, "scanner must make forward progress");
            pointer = end;
        }

        let eof_position = code.position_at(len);
        tokens.push(Token::new(
            TokenKind::EndOfInput,
            code.file_id,
            len,
            len,
            eof_position,
            LiteralValue::None,
        ));
        tokens
    }

    /// Recognise exactly one token starting at `pointer`, returning its kind,
    /// end offset, and (for literals) the parsed value.
    fn lex_one(&self, code: &Code, pointer: usize) -> (TokenKind, usize, LiteralValue) {
        let bytes = code.value;
        let c = bytes[pointer];

        if c.is_ascii_whitespace() {
            return self.lex_whitespace(bytes, pointer);
        }
        if c == b'/' && bytes.get(pointer + 1) == Some(&b'/') {
            return self.lex_line_comment(bytes, pointer);
        }
        if c == b'/' && bytes.get(pointer + 1) == Some(&b'*') {
            return self.lex_block_comment(code, pointer);
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            return self.lex_identifier(bytes, pointer);
        }
        if c.is_ascii_digit() {
            return self.lex_number(bytes, pointer);
        }
        if c == b'"' {
            return self.lex_string(code, pointer);
        }
        if c == b'\'' {
            return self.lex_char(code, pointer);
        }
        if let Some(end) = self.match_operator(bytes, pointer) {
            return (TokenKind::Operator, end, LiteralValue::None);
        }
        if PUNCTUATION.contains(&c) {
            return (TokenKind::Punctuation, pointer + 1, LiteralValue::None);
        }

        (TokenKind::Invalid, pointer + 1, LiteralValue::None)
    }

    fn lex_whitespace(&self, bytes: &[u8], pointer: usize) -> (TokenKind, usize, LiteralValue) {
        let mut end = pointer;
        while end < bytes.len() && bytes[end].is_ascii_whitespace() {
            end += 1;
        }
        (TokenKind::Whitespace, end, LiteralValue::None)
    }

    fn lex_line_comment(&self, bytes: &[u8], pointer: usize) -> (TokenKind, usize, LiteralValue) {
        let mut end = pointer + 2;
        while end < bytes.len() && bytes[end] != b'\n' {
            end += 1;
        }
        (TokenKind::Comment, end, LiteralValue::None)
    }

    /// Block comments are not nested (spec §4.1): the first `*/` closes the
    /// comment regardless of any `/*` encountered in between.
    fn lex_block_comment(&self, code: &Code, pointer: usize) -> (TokenKind, usize, LiteralValue) {
        let bytes = code.value;
        let mut cursor = pointer + 2;
        while cursor + 1 < bytes.len() {
            if bytes[cursor] == b'*' && bytes[cursor + 1] == b'/' {
                return (TokenKind::Comment, cursor + 2, LiteralValue::None);
            }
            cursor += 1;
        }
        // Unterminated block comment: one invalid token spanning the opening slash.
        (TokenKind::Invalid, pointer + 1, LiteralValue::None)
    }

    fn lex_identifier(&self, bytes: &[u8], pointer: usize) -> (TokenKind, usize, LiteralValue) {
        let mut end = pointer + 1;
        while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
            end += 1;
        }
        let lexeme = std::str::from_utf8(&bytes[pointer..end]).unwrap_or("");
        if KEYWORDS.contains(&lexeme) {
            (TokenKind::Keyword, end, LiteralValue::None)
        } else {
            (TokenKind::Identifier, end, LiteralValue::None)
        }
    }

    /// Matches the mantissa (digits, optional fractional part) with
    /// [NUMBER_PATTERN], then hand-checks for a following exponent marker: a
    /// regex optional group cannot partially match, so `1e+x` would never
    /// show up as `"1e"` inside a single `find()` result (the exponent group
    /// fails atomically and the match just stops at `"1"`). The exponent is
    /// therefore checked by hand so an `e`/`E` with no valid digit sequence
    /// after it can be reported as one invalid token, per spec §4.1.
    fn lex_number(&self, bytes: &[u8], pointer: usize) -> (TokenKind, usize, LiteralValue) {
        let m = NUMBER_PATTERN
            .find(&bytes[pointer..])
            .expect("a digit at `pointer` always matches the number pattern");
        debug_assert_eq!(m.start(), 0);
        let mantissa_end = pointer + m.end();

        if let Some(&marker) = bytes.get(mantissa_end) {
            if marker == b'e' || marker == b'E' {
                let mut cursor = mantissa_end + 1;
                if matches!(bytes.get(cursor), Some(b'+') | Some(b'-')) {
                    cursor += 1;
                }
                let digits_start = cursor;
                while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
                    cursor += 1;
                }
                if cursor == digits_start {
                    // Invalid exponent: no digits followed the `e`/`E` marker.
                    return (TokenKind::Invalid, mantissa_end + 1, LiteralValue::None);
                }
                let lexeme = std::str::from_utf8(&bytes[pointer..cursor]).unwrap_or("");
                let value = lexeme.parse::<f64>().unwrap_or(f64::NAN);
                return (TokenKind::FloatLiteral, cursor, LiteralValue::Float(value));
            }
        }

        let lexeme = std::str::from_utf8(&bytes[pointer..mantissa_end]).unwrap_or("");
        if lexeme.contains('.') {
            let value = lexeme.parse::<f64>().unwrap_or(f64::NAN);
            (TokenKind::FloatLiteral, mantissa_end, LiteralValue::Float(value))
        } else {
            match lexeme.parse::<i64>() {
                Ok(value) => (TokenKind::IntegerLiteral, mantissa_end, LiteralValue::Integer(value)),
                Err(_) => (TokenKind::IntegerLiteral, mantissa_end, LiteralValue::None),
            }
        }
    }

    fn lex_string(&self, code: &Code, pointer: usize) -> (TokenKind, usize, LiteralValue) {
        let bytes = code.value;
        let mut cursor = pointer + 1;
        let mut unescaped = String::new();
        loop {
            if cursor >= bytes.len() {
                return (TokenKind::Invalid, pointer + 1, LiteralValue::None);
            }
            match bytes[cursor] {
                b'"' => {
                    return (
                        TokenKind::StringLiteral,
                        cursor + 1,
                        LiteralValue::Str(unescaped),
                    )
                }
                b'\n' => return (TokenKind::Invalid, pointer + 1, LiteralValue::None),
                b'\\' => {
                    if cursor + 1 >= bytes.len() {
                        return (TokenKind::Invalid, pointer + 1, LiteralValue::None);
                    }
                    unescaped.push(unescape_byte(bytes[cursor + 1]));
                    cursor += 2;
                }
                b => {
                    unescaped.push(b as char);
                    cursor += 1;
                }
            }
        }
    }

    fn lex_char(&self, code: &Code, pointer: usize) -> (TokenKind, usize, LiteralValue) {
        let bytes = code.value;
        let mut cursor = pointer + 1;
        if cursor >= bytes.len() {
            return (TokenKind::Invalid, pointer + 1, LiteralValue::None);
        }
        let value = if bytes[cursor] == b'\\' {
            if cursor + 1 >= bytes.len() {
                return (TokenKind::Invalid, pointer + 1, LiteralValue::None);
            }
            let ch = unescape_byte(bytes[cursor + 1]);
            cursor += 2;
            ch
        } else if bytes[cursor] == b'\'' || bytes[cursor] == b'\n' {
            return (TokenKind::Invalid, pointer + 1, LiteralValue::None);
        } else {
            let ch = bytes[cursor] as char;
            cursor += 1;
            ch
        };
        if bytes.get(cursor) != Some(&b'\'') {
            return (TokenKind::Invalid, pointer + 1, LiteralValue::None);
        }
        (TokenKind::CharLiteral, cursor + 1, LiteralValue::Char(value))
    }

    fn match_operator(&self, bytes: &[u8], pointer: usize) -> Option<usize> {
        let remaining = &bytes[pointer..];
        let as_str = std::str::from_utf8(remaining).ok()?;
        for op in OPERATORS_3 {
            if as_str.starts_with(op) {
                return Some(pointer + op.len());
            }
        }
        for op in OPERATORS_2 {
            if as_str.starts_with(op) {
                return Some(pointer + op.len());
            }
        }
        for op in OPERATORS_1 {
            if as_str.starts_with(op) {
                return Some(pointer + op.len());
            }
        }
        None
    }
}

fn unescape_byte(b: u8) -> char {
    match b {
        b'n' => '\n',
        b't' => '\t',
        b'r' => '\r',
        b'0' => '\0',
        b'\\' => '\\',
        b'\'' => '\'',
        b'"' => '"',
        other => other as char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let code = Code::from(source);
        Scanner::new().scan(&code).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_input_yields_only_eof() {
        assert_eq!(kinds(""), vec![TokenKind::EndOfInput]);
    }

    #[test]
    fn identifier_round_trips() {
        let code = Code::from("x");
        let tokens = Scanner::new().scan(&code);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].slice(code.value), b"x");
    }

    #[test]
    fn compound_plus_plus_is_one_operator_token() {
        assert_eq!(
            kinds("++x"),
            vec![TokenKind::Operator, TokenKind::Identifier, TokenKind::EndOfInput]
        );
    }

    #[test]
    fn keyword_is_distinguished_from_identifier() {
        assert_eq!(kinds("region"), vec![TokenKind::Keyword, TokenKind::EndOfInput]);
        assert_eq!(kinds("regio"), vec![TokenKind::Identifier, TokenKind::EndOfInput]);
    }

    #[test]
    fn unterminated_string_yields_single_invalid_token() {
        let code = Code::from("\"unterminated");
        let tokens = Scanner::new().scan(&code);
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
        assert_eq!(tokens[0].start, 0);
        assert_eq!(tokens[0].end, 1);
    }

    #[test]
    fn invalid_exponent_is_reported_and_scanning_resumes() {
        let code = Code::from("1e+x");
        let tokens = Scanner::new().scan(&code);
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
        // scanning resumes right after the bad exponent marker, at `+`.
        assert_eq!(tokens[1].kind, TokenKind::Operator);
    }

    #[test]
    fn nested_block_comments_are_not_supported() {
        let code = Code::from("/* a /* b */ c */");
        let tokens = Scanner::new().scan(&code);
        // the first `*/` closes the comment; ` c */` is left to be scanned further.
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(&code.value[tokens[0].start..tokens[0].end], b"/* a /* b */");
    }

    #[test]
    fn scanner_round_trip_reproduces_source() {
        let source = "func main() { var x = 1 + 2; }";
        let code = Code::from(source);
        let tokens = Scanner::new().scan(&code);
        let mut reconstructed = Vec::new();
        for tok in &tokens {
            if tok.kind != TokenKind::EndOfInput {
                reconstructed.extend_from_slice(tok.slice(code.value));
            }
        }
        assert_eq!(reconstructed, source.as_bytes());
    }

    #[test]
    fn float_with_exponent_is_classified_as_float() {
        let code = Code::from("1e10");
        let tokens = Scanner::new().scan(&code);
        assert_eq!(tokens[0].kind, TokenKind::FloatLiteral);
    }
}
