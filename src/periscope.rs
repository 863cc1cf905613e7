//! Lifetime contracts that gate validator execution (spec §4.5).

use crate::ids::CellId;
use std::collections::HashMap;

/// The one guarantee bit every built-in validator currently requires: that it
/// is safe to observe the cells its constraint names. Distinct guarantee
/// classes would get their own bit if a validator ever needed a narrower
/// promise than "the cells exist and are live" (spec §4.5, "Contract").
pub const OBSERVE_CELLS: u32 = 0b0001;

/// Identifies a validator for the purpose of a [Contract]'s guarantee bits.
/// A thin newtype rather than a raw `usize` so a stray array index can't be
/// passed where a validator identity is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidatorId(pub usize);

/// A lifetime guarantee: `region` is still valid for `validator` to observe
/// the cells it was registered against, subject to `guarantee_bits` covering
/// what that validator requires (spec §3, "Periscope").
#[derive(Debug, Clone, Copy)]
pub struct Contract {
    pub region_id: usize,
    pub validator_id: ValidatorId,
    pub guarantee_bits: u32,
    pub valid: bool,
}

impl Contract {
    pub fn new(region_id: usize, validator_id: ValidatorId, guarantee_bits: u32) -> Self {
        Self { region_id, validator_id, guarantee_bits, valid: true }
    }

    pub fn revoke(&mut self) {
        self.valid = false;
    }

    fn satisfies(&self, required_bits: u32) -> bool {
        self.valid && (self.guarantee_bits & required_bits) == required_bits
    }
}

/// Token-to-cell resolver plus the contract registry that gates whether a
/// validator is allowed to observe a cell this iteration (spec §4.5).
/// Process-local for the duration of one compile; never shared across fields.
#[derive(Default)]
pub struct Periscope {
    token_to_cell: HashMap<usize, CellId>,
    contracts: Vec<Contract>,
    /// Soft failures recorded when no contract covered a requested validator;
    /// kept for diagnostics rather than silently dropped.
    soft_failures: Vec<(usize, ValidatorId)>,
}

impl Periscope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token at `token_index` as resolving to `cell`. Many-to-one
    /// is accepted (token aliasing); re-registering a token simply overwrites
    /// its mapping.
    pub fn register(&mut self, token_index: usize, cell: CellId) {
        self.token_to_cell.insert(token_index, cell);
    }

    pub fn add_contract(&mut self, contract: Contract) {
        self.contracts.push(contract);
    }

    /// Resolves a token to its cell id, normalising a corrupt or stale raw id
    /// into range first (spec §4.5, "Cell-id normalisation"). `cell_count` is
    /// the field's current cell count.
    pub fn resolve(&self, token_index: usize, cell_count: usize) -> Option<CellId> {
        let raw = self.token_to_cell.get(&token_index)?;
        normalize_cell_id(raw.index(), cell_count)
    }

    /// True only if at least one valid contract's guarantee bits cover
    /// `required_bits` for `validator`; otherwise records a soft failure
    /// (spec §4.5, "Contract"). A soft failure is not an error: the caller
    /// treats the constraint as vacuously satisfied for this iteration.
    pub fn validate_constraints(&mut self, validator: ValidatorId, required_bits: u32) -> bool {
        let satisfied = self
            .contracts
            .iter()
            .any(|c| c.validator_id == validator && c.satisfies(required_bits));
        if !satisfied {
            self.soft_failures.push((self.contracts.len(), validator));
        }
        satisfied
    }

    pub fn soft_failure_count(&self) -> usize {
        self.soft_failures.len()
    }
}

/// Clamp/modulo normalisation for a raw cell id against a field with
/// `cell_count` cells (spec §4.5): ids at or below the maximum pass through;
/// ids up to twice the maximum clamp down to it; larger ids wrap modulo the
/// count. An empty field has no valid id to return.
fn normalize_cell_id(id: usize, cell_count: usize) -> Option<CellId> {
    if cell_count == 0 {
        return None;
    }
    let max = cell_count - 1;
    let normalized = if id <= max {
        id
    } else if id <= 2 * max {
        max
    } else {
        id % cell_count
    };
    Some(CellId::from(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_within_range_pass_through() {
        assert_eq!(normalize_cell_id(3, 10).map(|c| c.index()), Some(3));
    }

    #[test]
    fn ids_up_to_double_max_clamp_to_max() {
        assert_eq!(normalize_cell_id(15, 10), normalize_cell_id(9, 10));
    }

    #[test]
    fn ids_beyond_double_max_wrap_modulo_count() {
        assert_eq!(normalize_cell_id(25, 10).map(|c| c.index()), Some(5));
    }

    #[test]
    fn empty_field_has_no_valid_lookup() {
        assert_eq!(normalize_cell_id(0, 0), None);
    }

    #[test]
    fn soft_failure_recorded_when_no_contract_covers_validator() {
        let mut periscope = Periscope::new();
        assert!(!periscope.validate_constraints(ValidatorId(1), 0b1));
        assert_eq!(periscope.soft_failure_count(), 1);
    }

    #[test]
    fn revoked_contract_no_longer_satisfies() {
        let mut periscope = Periscope::new();
        let mut contract = Contract::new(0, ValidatorId(1), 0b1);
        contract.revoke();
        periscope.add_contract(contract);
        assert!(!periscope.validate_constraints(ValidatorId(1), 0b1));
    }
}
