//! Superposed grammatical states held by an [EntropyCell](crate::cell::EntropyCell).

use crate::ids::StateId;
use crate::token::TokenKind;
use std::fmt::{Display, Formatter};

/// What an [EntropyState] stands for inside a cell's superposition (spec §3,
/// "EntropyState").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// The cell resolves to one scanned token, unchanged.
    Token,
    /// The cell resolves to a named grammatical production (e.g. `if-statement`).
    Production,
    /// A placeholder state inserted by a pattern validator (e.g. `optional`/`epsilon`).
    Epsilon,
}

/// One candidate collapse target for a cell. States are never removed from a
/// cell's backing store; elimination is recorded with a flag so constraint
/// provenance stays inspectable after the fact (spec §3, "Design rationale").
#[derive(Debug, Clone)]
pub struct EntropyState {
    pub id: StateId,
    pub kind: StateKind,
    pub label: String,
    /// Index into the token buffer this state resolves to, when `kind` is `Token`.
    pub token_index: Option<usize>,
    /// For a `Token`-kind state, the grammatical kind this candidate interprets
    /// the underlying token as. Ordinarily identical to the token's own lexed
    /// kind; a cell seeded with an alternate interpretation (e.g. a keyword
    /// read contextually as a plain identifier) carries two token-states
    /// sharing one `token_index` but disagreeing on `interpreted_kind`, which
    /// is what pattern validators key off of rather than the raw token
    /// (spec §4.6 step 1, "plus any alternate interpretations... identifier
    /// vs contextual keyword").
    pub interpreted_kind: Option<TokenKind>,
    /// Integer probability weight in `0..=100`, used to break entropy ties only
    /// after id-order has already been consulted (spec §4.2, "Observation").
    pub weight: u8,
    eliminated: bool,
}

impl EntropyState {
    pub fn token(
        id: StateId,
        label: impl Into<String>,
        token_index: usize,
        interpreted_kind: TokenKind,
        weight: u8,
    ) -> Self {
        Self {
            id,
            kind: StateKind::Token,
            label: label.into(),
            token_index: Some(token_index),
            interpreted_kind: Some(interpreted_kind),
            weight,
            eliminated: false,
        }
    }

    pub fn production(id: StateId, label: impl Into<String>, weight: u8) -> Self {
        Self {
            id,
            kind: StateKind::Production,
            label: label.into(),
            token_index: None,
            interpreted_kind: None,
            weight,
            eliminated: false,
        }
    }

    pub fn epsilon(id: StateId, label: impl Into<String>) -> Self {
        Self {
            id,
            kind: StateKind::Epsilon,
            label: label.into(),
            token_index: None,
            interpreted_kind: None,
            weight: 0,
            eliminated: false,
        }
    }

    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    /// Validators only ever move a state from live to eliminated, never back
    /// (spec §4.3, "Validator monotonicity"). Returns whether this call changed
    /// anything, so callers can detect genuine progress during propagation.
    pub fn eliminate(&mut self) -> bool {
        let changed = !self.eliminated;
        self.eliminated = true;
        changed
    }
}

impl Display for EntropyState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.eliminated {
            write!(f, "{}#{}(x)", self.label, self.id)
        } else {
            write!(f, "{}#{}", self.label, self.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elimination_is_monotone_and_idempotent() {
        let mut state = EntropyState::production(StateId::from(0), "stmt", 50);
        assert!(!state.is_eliminated());
        assert!(state.eliminate());
        assert!(state.is_eliminated());
        assert!(!state.eliminate(), "eliminating twice reports no further change");
    }
}
