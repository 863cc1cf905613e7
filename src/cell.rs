//! A single source position holding a superposition of candidate states.

use crate::ids::{CellId, StateId};
use crate::position::Position;
use crate::state::EntropyState;

/// One position in the field: an ordered, append-only set of [EntropyState]s
/// plus the bookkeeping needed to decide when it has collapsed (spec §3,
/// "EntropyCell").
#[derive(Debug, Clone)]
pub struct EntropyCell {
    pub id: CellId,
    pub position: Position,
    states: Vec<EntropyState>,
}

impl EntropyCell {
    pub fn new(id: CellId, position: Position) -> Self {
        Self {
            id,
            position,
            states: Vec::new(),
        }
    }

    pub fn add_state(&mut self, state: EntropyState) {
        self.states.push(state);
    }

    pub fn states(&self) -> &[EntropyState] {
        &self.states
    }

    pub fn state_mut(&mut self, id: StateId) -> Option<&mut EntropyState> {
        self.states.iter_mut().find(|s| s.id == id)
    }

    pub fn live_states(&self) -> impl Iterator<Item = &EntropyState> {
        self.states.iter().filter(|s| !s.is_eliminated())
    }

    pub fn live_count(&self) -> usize {
        self.live_states().count()
    }

    /// A cell is collapsed once exactly one state remains live (spec §3,
    /// "Invariants"). A cell with zero live states is a contradiction, not a
    /// collapse, so it deliberately does not satisfy this predicate.
    pub fn is_collapsed(&self) -> bool {
        self.live_count() == 1
    }

    pub fn is_contradiction(&self) -> bool {
        !self.states.is_empty() && self.live_count() == 0
    }

    /// The single surviving state once `is_collapsed` holds.
    pub fn collapsed_state(&self) -> Option<&EntropyState> {
        let mut live = self.live_states();
        let first = live.next()?;
        if live.next().is_some() {
            None
        } else {
            Some(first)
        }
    }

    /// Shannon-free entropy proxy used for minimum-entropy cell selection
    /// (spec §4.2): the count of live states, except a collapsed cell reports
    /// zero exactly as the spec requires ("collapsed cells report zero").
    /// `min_entropy_cell` also excludes collapsed/contradiction cells from
    /// candidacy outright, so this only matters to a caller reading `entropy`
    /// directly off a collapsed cell.
    pub fn entropy(&self) -> usize {
        if self.is_collapsed() {
            0
        } else {
            self.live_count()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EntropyState;

    fn cell_with(n: usize) -> EntropyCell {
        let mut cell = EntropyCell::new(CellId::from(0), Position::new(1, 1, 0));
        for i in 0..n {
            cell.add_state(EntropyState::production(StateId::from(i), format!("s{i}"), 10));
        }
        cell
    }

    #[test]
    fn single_state_cell_is_collapsed() {
        assert!(cell_with(1).is_collapsed());
    }

    #[test]
    fn multi_state_cell_is_not_collapsed() {
        assert!(!cell_with(3).is_collapsed());
    }

    #[test]
    fn collapsed_cell_reports_zero_entropy() {
        assert_eq!(cell_with(1).entropy(), 0);
    }

    #[test]
    fn uncollapsed_cell_entropy_tracks_live_count() {
        assert_eq!(cell_with(3).entropy(), 3);
    }

    #[test]
    fn eliminating_all_states_is_a_contradiction() {
        let mut cell = cell_with(2);
        for state in cell.states.iter_mut() {
            state.eliminate();
        }
        assert!(cell.is_contradiction());
        assert!(!cell.is_collapsed());
    }
}
