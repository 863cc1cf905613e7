//! The entropy field: the whole board the WFC driver collapses.

use crate::cell::EntropyCell;
use crate::constraint::{Constraint, ConstraintKind, ValidatorFn, ValidatorOutcome};
use crate::ids::{CellId, ConstraintId, StateId};
use crate::periscope::{Periscope, OBSERVE_CELLS};
use crate::position::Position;
use crate::state::{EntropyState, StateKind};
use crate::token::{Token, TokenKind};
use ptree::{print_tree, TreeBuilder};
use std::rc::Rc;

/// Owns every [EntropyCell] and [Constraint] for one compile. There is no
/// shared ownership here: cells and constraints live in flat, index-addressed
/// `Vec`s, the Rust arena standing in for the entity/region-allocator
/// substrate the teacher's own parser does without (spec §5, §9).
///
/// The token buffer and source bytes a field was seeded from are held by
/// shared reference (spec §3, "Tokens are owned by the scanner's output
/// buffer; the field... hold[s] non-owning references"): `Rc` lets the
/// periscope and output extraction share the same buffer without the field
/// claiming unique ownership of it.
#[derive(Debug, Default)]
pub struct EntropyField {
    cells: Vec<EntropyCell>,
    constraints: Vec<Constraint>,
    next_state_id: usize,
    tokens: Option<Rc<Vec<Token>>>,
    source: Option<Rc<[u8]>>,
}

impl EntropyField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cell(&mut self, position: Position) -> CellId {
        let id = CellId::from(self.cells.len());
        self.cells.push(EntropyCell::new(id, position));
        id
    }

    fn fresh_state_id(&mut self) -> StateId {
        let id = StateId::from(self.next_state_id);
        self.next_state_id += 1;
        id
    }

    pub fn add_token_state(
        &mut self,
        cell: CellId,
        label: impl Into<String>,
        token_index: usize,
        interpreted_kind: TokenKind,
        weight: u8,
    ) -> StateId {
        self.assert_room_for_state(cell);
        let id = self.fresh_state_id();
        let state = EntropyState::token(id, label, token_index, interpreted_kind, weight);
        self.cell_mut(cell).add_state(state);
        id
    }

    pub fn add_production_state(&mut self, cell: CellId, label: impl Into<String>, weight: u8) -> StateId {
        self.assert_room_for_state(cell);
        let id = self.fresh_state_id();
        let state = EntropyState::production(id, label, weight);
        self.cell_mut(cell).add_state(state);
        id
    }

    pub fn add_epsilon_state(&mut self, cell: CellId, label: impl Into<String>) -> StateId {
        self.assert_room_for_state(cell);
        let id = self.fresh_state_id();
        let state = EntropyState::epsilon(id, label);
        self.cell_mut(cell).add_state(state);
        id
    }

    /// Guards every seed path against a cell's candidate set growing past
    /// [crate::MAX_STATES_PER_CELL] (spec §4.2, "Add state to cell"): a
    /// pattern or caller seeding more alternatives than that into one cell is
    /// a programming error in the seed logic, not a recoverable condition.
    fn assert_room_for_state(&self, cell: CellId) {
        assert!(
            self.cell(cell).states().len() < crate::MAX_STATES_PER_CELL,
            "cell #{cell} already holds the maximum of {} candidate states",
            crate::MAX_STATES_PER_CELL
        );
    }

    /// Installs a new constraint. Every cell it names must already exist in
    /// this field (spec §4.2, "Add constraint (fails if any referenced cell
    /// does not exist)"; spec §3, "Invariants"): a caller passing an
    /// out-of-range id is a programming error, not a recoverable runtime
    /// condition, so this fails the same way `Constraint::new` already does
    /// for an empty cell list — an unconditional `assert!`, not a
    /// debug-only check that release builds would silently skip.
    pub fn add_constraint(
        &mut self,
        kind: ConstraintKind,
        cells: Vec<CellId>,
        description: impl Into<String>,
        validator_id: crate::periscope::ValidatorId,
        validator: ValidatorFn,
    ) -> ConstraintId {
        assert!(
            cells.iter().all(|c| c.index() < self.cells.len()),
            "constraint references a cell that does not exist in this field"
        );
        let id = ConstraintId::from(self.constraints.len());
        self.constraints
            .push(Constraint::new(id, kind, cells, validator_id, description, validator));
        id
    }

    /// Attaches the scanner's output buffer and source bytes this field was
    /// seeded from. Set once by the driver during seeding.
    pub fn set_source(&mut self, tokens: Rc<Vec<Token>>, source: Rc<[u8]>) {
        self.tokens = Some(tokens);
        self.source = Some(source);
    }

    pub fn tokens(&self) -> Option<&Rc<Vec<Token>>> {
        self.tokens.as_ref()
    }

    pub fn source(&self) -> Option<&Rc<[u8]>> {
        self.source.as_ref()
    }

    pub fn cells(&self) -> &[EntropyCell] {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> &EntropyCell {
        &self.cells[id.index()]
    }

    pub fn cell_mut(&mut self, id: CellId) -> &mut EntropyCell {
        &mut self.cells[id.index()]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Eliminate `state` in `cell`, reporting whether anything changed. This
    /// is the only mutation path a validator closure is expected to use.
    pub fn eliminate(&mut self, cell: CellId, state: StateId) -> bool {
        self.cell_mut(cell)
            .state_mut(state)
            .map(|s| s.eliminate())
            .unwrap_or(false)
    }

    /// Run every constraint once, in id order, gated through `periscope`
    /// (spec §4.5: "if no contract is valid, the default validator is used
    /// and the suspicious constraint is skipped"). A constraint whose
    /// validator id has no valid, sufficiently-permissive contract is treated
    /// as vacuously satisfied for this pass rather than run. Returns the
    /// strongest outcome observed: `Contradiction` if any constraint reports
    /// one, else `Progress` if any made progress, else `Stable` (spec §4.2,
    /// "Propagation").
    pub fn propagate_once(&mut self, periscope: &mut Periscope) -> ValidatorOutcome {
        let mut saw_progress = false;
        let mut saw_contradiction = false;
        for index in 0..self.constraints.len() {
            let constraint = self.constraints[index].clone();
            if !periscope.validate_constraints(constraint.validator_id, OBSERVE_CELLS) {
                continue;
            }
            match constraint.run(self) {
                ValidatorOutcome::Contradiction => saw_contradiction = true,
                ValidatorOutcome::Progress => saw_progress = true,
                ValidatorOutcome::Stable => {}
            }
        }
        if saw_contradiction {
            ValidatorOutcome::Contradiction
        } else if saw_progress {
            ValidatorOutcome::Progress
        } else {
            ValidatorOutcome::Stable
        }
    }

    /// The not-yet-collapsed cell with the fewest live states, ties broken by
    /// ascending [CellId] (spec §4.2, "Observation"). Cells that are already
    /// collapsed or already contradictory are not candidates.
    pub fn min_entropy_cell(&self) -> Option<CellId> {
        self.cells
            .iter()
            .filter(|c| !c.is_collapsed() && !c.is_contradiction())
            .min_by_key(|c| (c.entropy(), c.id.index()))
            .map(|c| c.id)
    }

    pub fn is_fully_collapsed(&self) -> bool {
        !self.cells.is_empty() && self.cells.iter().all(|c| c.is_collapsed())
    }

    pub fn has_contradiction(&self) -> bool {
        self.cells.iter().any(|c| c.is_contradiction())
    }

    /// The first contradictory cell in source order, used to anchor the single
    /// diagnostic the driver reports for a failed compile (spec §7).
    pub fn first_contradiction(&self) -> Option<CellId> {
        self.cells.iter().find(|c| c.is_contradiction()).map(|c| c.id)
    }

    /// Render the field as an indented tree for debugging, the way the teacher
    /// prints an `ASTNode` with `ptree`.
    pub fn print(&self) -> std::io::Result<()> {
        let mut builder = TreeBuilder::new("EntropyField".to_string());
        for cell in &self.cells {
            builder.begin_child(format!("cell#{} @ {}", cell.id, cell.position));
            for state in cell.states() {
                let marker = match state.kind {
                    StateKind::Token => "token",
                    StateKind::Production => "prod",
                    StateKind::Epsilon => "eps",
                };
                builder.add_empty_child(format!("{marker} {state}"));
            }
            builder.end_child();
        }
        let tree = builder.build();
        print_tree(&tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_field_is_not_fully_collapsed() {
        assert!(!EntropyField::new().is_fully_collapsed());
    }

    #[test]
    fn single_state_cells_collapse_immediately() {
        let mut field = EntropyField::new();
        let cell = field.add_cell(Position::new(1, 1, 0));
        field.add_token_state(cell, "x", 0, TokenKind::Identifier, 100);
        assert!(field.is_fully_collapsed());
        assert_eq!(field.min_entropy_cell(), None);
    }

    #[test]
    fn min_entropy_prefers_fewer_live_states_then_lower_id() {
        let mut field = EntropyField::new();
        let a = field.add_cell(Position::new(1, 1, 0));
        let b = field.add_cell(Position::new(1, 2, 1));
        field.add_production_state(a, "p1", 10);
        field.add_production_state(a, "p2", 10);
        field.add_production_state(b, "p1", 10);
        field.add_production_state(b, "p2", 10);
        field.add_production_state(b, "p3", 10);
        assert_eq!(field.min_entropy_cell(), Some(a));
    }

    #[test]
    fn contradiction_and_full_collapse_are_mutually_exclusive() {
        let mut field = EntropyField::new();
        let cell = field.add_cell(Position::new(1, 1, 0));
        let state = field.add_production_state(cell, "p1", 10);
        field.eliminate(cell, state);
        assert!(field.has_contradiction());
        assert!(!field.is_fully_collapsed());
        assert_eq!(field.first_contradiction(), Some(cell));
    }

    #[test]
    #[should_panic(expected = "already holds the maximum")]
    fn seeding_past_the_state_cap_panics() {
        let mut field = EntropyField::new();
        let cell = field.add_cell(Position::new(1, 1, 0));
        for i in 0..=crate::MAX_STATES_PER_CELL {
            field.add_production_state(cell, format!("p{i}"), 10);
        }
    }
}
