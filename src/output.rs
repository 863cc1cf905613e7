//! Walks a collapsed (or partially collapsed) field and emits the canonical
//! token stream plus diagnostics (spec §4.7).

use crate::error::{Category, Diagnostic, Severity};
use crate::field::EntropyField;
use crate::token::{LiteralValue, Token, TokenKind};
use std::rc::Rc;

/// Flags controlling which trivia classes extraction keeps (spec §6, "a
/// boolean flag on the extraction call removes either or both").
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub strip_whitespace: bool,
    pub strip_comments: bool,
}

impl ExtractOptions {
    pub fn strip_all_trivia() -> Self {
        Self { strip_whitespace: true, strip_comments: true }
    }
}

/// One token recovered from a collapsed cell, independent of the field it
/// came from (spec §6, "Token stream output").
#[derive(Debug, Clone)]
pub struct ExtractedToken {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    pub literal: LiteralValue,
    source: Rc<[u8]>,
}

impl ExtractedToken {
    fn from_token(token: &Token, source: Rc<[u8]>) -> Self {
        Self {
            kind: token.kind,
            start: token.start,
            end: token.end,
            line: token.line,
            column: token.column,
            literal: token.literal.clone(),
            source,
        }
    }

    pub fn text(&self) -> &[u8] {
        &self.source[self.start..self.end]
    }
}

/// The result of one extraction pass: the recovered tokens in source order,
/// plus at most one contradiction diagnostic and any relaxed-mode warnings
/// (spec §7, "at most one contradiction per cell... the first failing cell
/// in source order is the primary diagnostic").
#[derive(Debug, Default)]
pub struct ExtractResult {
    pub tokens: Vec<ExtractedToken>,
    pub diagnostics: Vec<Diagnostic>,
}

impl EntropyField {
    /// Extracts the canonical token stream from this field's collapsed cells.
    /// Panics if the field was never seeded with a token buffer (spec §3,
    /// "Tokens are owned by the scanner's output buffer"): extraction before
    /// seeding is a programming error, not a recoverable runtime condition.
    pub fn extract(&self, options: ExtractOptions) -> ExtractResult {
        let tokens = self
            .tokens()
            .expect("field must be seeded with a token buffer before extraction")
            .clone();
        let source = self
            .source()
            .expect("field must be seeded with source bytes before extraction")
            .clone();

        let mut result = ExtractResult::default();
        let mut reported_contradiction = false;

        for cell in self.cells() {
            if let Some(state) = cell.collapsed_state() {
                if let Some(token_index) = state.token_index {
                    let token = &tokens[token_index];
                    if options.strip_whitespace && token.kind == TokenKind::Whitespace {
                        continue;
                    }
                    if options.strip_comments && token.kind == TokenKind::Comment {
                        continue;
                    }
                    result.tokens.push(ExtractedToken::from_token(token, source.clone()));
                }
                continue;
            }

            if cell.is_contradiction() {
                if !reported_contradiction {
                    let eliminated: Vec<&str> = cell.states().iter().map(|s| s.label.as_str()).collect();
                    result.diagnostics.push(Diagnostic::syntax(
                        cell.position,
                        format!("contradiction at cell #{}: eliminated {}", cell.id, eliminated.join(", ")),
                    ));
                    reported_contradiction = true;
                }
                continue;
            }

            // Relaxed mode: a cell that never collapsed and isn't the primary
            // contradiction is skipped with a warning rather than aborting
            // extraction (spec §4.7, "in relaxed mode, skipped with a warning").
            result.diagnostics.push(Diagnostic::new(
                Severity::Warning,
                Category::Syntax,
                cell.position,
                format!("cell #{} left uncollapsed, skipped", cell.id),
            ));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Code;
    use crate::position::Position;
    use crate::scanner::Scanner;

    fn seed(source: &str) -> EntropyField {
        let code = Code::from(source);
        let tokens = Scanner::new().scan(&code);
        let mut field = EntropyField::new();
        for (i, token) in tokens.iter().enumerate() {
            let cell = field.add_cell(Position::new(token.line, token.column, token.start));
            field.add_token_state(cell, format!("{}", token.kind), i, token.kind, 100);
        }
        field.set_source(Rc::new(tokens), Rc::from(code.value));
        field
    }

    #[test]
    fn extracted_length_matches_collapsed_cell_count() {
        let field = seed("x");
        let result = field.extract(ExtractOptions::default());
        assert_eq!(result.tokens.len(), field.cells().len());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn strip_whitespace_removes_whitespace_tokens() {
        let field = seed("1  +  2");
        let result = field.extract(ExtractOptions::strip_all_trivia());
        assert!(result.tokens.iter().all(|t| t.kind != TokenKind::Whitespace));
    }

    #[test]
    fn contradiction_is_reported_once_at_first_failing_cell() {
        let mut field = seed("x");
        let cell = field.cells()[0].id;
        let state = field.cell(cell).states()[0].id;
        field.eliminate(cell, state);
        let result = field.extract(ExtractOptions::default());
        assert_eq!(result.diagnostics.len(), 1);
    }
}
