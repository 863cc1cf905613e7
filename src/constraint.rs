//! Constraints: predicates over a set of cells that prune contradictory states.

use crate::field::EntropyField;
use crate::ids::{CellId, ConstraintId};
use crate::periscope::ValidatorId;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Where a [Constraint] originated, mirroring the sources named in spec §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Byte-gap adjacency between two structural tokens.
    Adjacency,
    /// Ordering of a fixed-length run of cells (statement sequencing).
    Sequence,
    /// A region/regime lifetime is still valid at the point of use.
    RegionLifetime,
    /// Two regimes must agree on ordering semantics (fifo/filo/seq/rand).
    RegimeCompatibility,
    /// Installed by a [Periscope](crate::periscope::Periscope) contract.
    Periscope,
    /// Installed by a grammar [Pattern](crate::pattern::Pattern) compilation.
    Grammar,
    /// Anything a caller installs directly through [EntropyField::add_constraint].
    UserCustom,
}

/// What happened the last time a constraint's validator ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorOutcome {
    /// At least one state was eliminated; propagation must continue.
    Progress,
    /// Nothing changed; the constraint is locally satisfied for now.
    Stable,
    /// Every state of some cell the constraint touches is now eliminated.
    Contradiction,
}

pub type ValidatorFn = Rc<dyn Fn(&Constraint, &mut EntropyField) -> ValidatorOutcome>;

/// A predicate tying together an ordered, non-empty list of cells (spec §3,
/// "Constraint"). Constraints are pure data plus a closure: the closure is the
/// only thing that ever mutates cell state, and it may only eliminate.
#[derive(Clone)]
pub struct Constraint {
    pub id: ConstraintId,
    pub kind: ConstraintKind,
    pub cells: Vec<CellId>,
    /// Identifies the validator this constraint runs under for the purpose of
    /// periscope gating (spec §4.5): [EntropyField::propagate_once](crate::field::EntropyField::propagate_once)
    /// only invokes this constraint's validator while a contract covers this id.
    pub validator_id: ValidatorId,
    pub description: String,
    validator: ValidatorFn,
}

impl Constraint {
    /// Builds a new constraint. Panics if `cells` is empty: every constraint
    /// must name at least one cell to have anything to validate (spec §3,
    /// "Invariants").
    pub fn new(
        id: ConstraintId,
        kind: ConstraintKind,
        cells: Vec<CellId>,
        validator_id: ValidatorId,
        description: impl Into<String>,
        validator: ValidatorFn,
    ) -> Self {
        assert!(!cells.is_empty(), "a constraint must reference at least one cell");
        Self {
            id,
            kind,
            cells,
            validator_id,
            description: description.into(),
            validator,
        }
    }

    pub fn run(&self, field: &mut EntropyField) -> ValidatorOutcome {
        (self.validator)(self, field)
    }
}

impl Debug for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constraint")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("cells", &self.cells)
            .field("validator_id", &self.validator_id)
            .field("description", &self.description)
            .finish()
    }
}
