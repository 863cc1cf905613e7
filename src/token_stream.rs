//! A structural view over the scanner's raw token buffer.
//!
//! Adjacency, sequence, and pattern validators reason about structural tokens
//! only; whitespace and comments stay in the underlying buffer (so extraction
//! can still recover them) but are skipped when the driver walks "what comes
//! next". This mirrors the teacher's `TokenStream`/`FltrPtr` split between a
//! raw and a filtered index space.

use crate::token::{Token, TokenKind};

/// Borrows a scanner's output buffer and precomputes which positions are
/// structural (spec §3, cross-referenced from `TokenKind::is_structural`).
pub struct TokenStream<'t> {
    tokens: &'t [Token],
    filtered: Vec<usize>,
}

impl<'t> TokenStream<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        let filtered = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind.is_structural())
            .map(|(i, _)| i)
            .collect();
        Self { tokens, filtered }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    /// Token at a raw (unfiltered) index.
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Token at a filtered (structural-only) index.
    pub fn filtered_get(&self, filtered_index: usize) -> Option<&Token> {
        self.filtered.get(filtered_index).and_then(|&i| self.tokens.get(i))
    }

    /// The raw index a filtered index maps to.
    pub fn original_index(&self, filtered_index: usize) -> Option<usize> {
        self.filtered.get(filtered_index).copied()
    }

    /// The filtered index a raw index maps to, if that position is structural.
    pub fn filtered_index(&self, original_index: usize) -> Option<usize> {
        self.filtered.iter().position(|&i| i == original_index)
    }

    pub fn structural(&self) -> impl Iterator<Item = &Token> {
        self.filtered.iter().map(move |&i| &self.tokens[i])
    }

    pub fn is_eos(&self, index: usize) -> bool {
        self.tokens
            .get(index)
            .map(|t| t.kind == TokenKind::EndOfInput)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Code;
    use crate::scanner::Scanner;

    #[test]
    fn whitespace_is_excluded_from_the_structural_view() {
        let code = Code::from("1  +  2");
        let tokens = Scanner::new().scan(&code);
        let stream = TokenStream::new(&tokens);
        assert!(stream.filtered_len() < stream.len());
        assert!(stream.structural().all(|t| t.kind.is_structural()));
    }

    #[test]
    fn filtered_and_original_indices_round_trip() {
        let code = Code::from("x");
        let tokens = Scanner::new().scan(&code);
        let stream = TokenStream::new(&tokens);
        let original = stream.original_index(0).unwrap();
        assert_eq!(stream.filtered_index(original), Some(0));
    }
}
