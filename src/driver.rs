//! The propagate/observe fixed-point solver (spec §4.6).

use crate::code::Code;
use crate::constraint::{ConstraintKind, ValidatorOutcome};
use crate::error::{Diagnostic, ImplementationError};
use crate::field::EntropyField;
use crate::ids::{CellId, StateId};
use crate::log::Log;
use crate::pattern::PatternRegistry;
use crate::periscope::{Contract, Periscope, ValidatorId};
use crate::position::Position;
use crate::scanner::Scanner;
use crate::token::{Token, TokenKind};
use crate::token_stream::TokenStream;
use crate::validators;
use std::rc::Rc;

/// Tuning knobs for one run of the driver, standing in for the external
/// configuration surface the core has no CLI/file format for (spec §6).
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    /// Iteration bound before the run is treated as an internal-error
    /// contradiction (spec §4.6, step 5).
    pub max_iterations: usize,
    /// Resolves the Design Notes open question on sequence leniency: `false`
    /// (default) only hard-fails an out-of-order triple once all three cells
    /// have collapsed; `true` hard-fails immediately.
    pub strict_sequence: bool,
    /// Resolves the Design Notes open question on trivia: `true` (default)
    /// keeps whitespace/comment cells in the field (with the adjacency
    /// tolerance that implies); stripping is left to [crate::ExtractOptions]
    /// after the fact rather than decided at seed time.
    pub keep_trivia: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { max_iterations: 100, strict_sequence: false, keep_trivia: true }
    }
}

/// What a completed (or aborted) run produced.
pub struct WfcOutcome {
    pub field: EntropyField,
    pub periscope: Periscope,
    pub diagnostics: Vec<Diagnostic>,
    pub iterations: usize,
}

/// Schedules scanning, seeding, constraint installation, and the
/// propagate/observe loop for one compile.
pub struct WfcDriver {
    config: DriverConfig,
    scanner: Scanner,
    registry: Rc<PatternRegistry>,
    log: Option<Log<&'static str>>,
}

impl WfcDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            scanner: Scanner::new(),
            registry: Rc::new(PatternRegistry::standard()),
            log: None,
        }
    }

    pub fn with_registry(mut self, registry: Rc<PatternRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_log(mut self, log: Log<&'static str>) -> Self {
        self.log = Some(log);
        self
    }

    /// Runs the full pipeline on `source`: scan, seed, install constraints,
    /// then propagate/observe until the field is fully collapsed, is
    /// contradictory, or the iteration bound is exceeded (in which case the
    /// bound violation is itself reported as a forced contradiction, per
    /// spec §4.6 step 5 and §7's system-error category).
    pub fn run(&self, source: &str) -> Result<WfcOutcome, ImplementationError> {
        let owned_source: Rc<[u8]> = Rc::from(source.as_bytes());
        let code = Code::from(owned_source.as_ref());
        let tokens = Rc::new(self.scanner.scan(&code));

        #[cfg(debug_assertions)]
        if let Some(log) = &self.log {
            if log.order() >= 1 {
                println!("[{}] scanned {} tokens", log, tokens.len());
            }
        }

        let mut field = EntropyField::new();
        let mut periscope = Periscope::new();
        for (index, token) in tokens.iter().enumerate() {
            let cell = field.add_cell(Position::new(token.line, token.column, token.start));
            field.add_token_state(cell, format!("{}", token.kind), index, token.kind, 100);
            // A keyword read contextually as a plain identifier is a live
            // alternate interpretation until grammar constraints rule it out
            // (spec §4.6 step 1): seed it alongside the primary reading, at a
            // lower weight so an unconstrained collapse still prefers the
            // keyword.
            if token.kind == TokenKind::Keyword {
                field.add_token_state(
                    cell,
                    format!("{}-as-identifier", token.kind),
                    index,
                    TokenKind::Identifier,
                    20,
                );
            }
            periscope.register(index, cell);
        }
        field.set_source(tokens.clone(), owned_source.clone());

        let mut diagnostics = Vec::new();
        self.install_constraints(&mut field, &mut periscope, &tokens, &owned_source);

        let mut iteration = 0usize;
        let mut stalled = 0usize;
        let mut forced_without_improvement = 0usize;
        let mut last_collapsed = count_collapsed(&field);

        loop {
            if field.is_fully_collapsed() || field.has_contradiction() {
                break;
            }
            if iteration >= self.config.max_iterations {
                diagnostics.push(Diagnostic::system(
                    Position::new(0, 0, 0),
                    format!("iteration bound of {} exceeded", self.config.max_iterations),
                ));
                force_contradiction(&mut field);
                break;
            }
            iteration += 1;

            loop {
                match field.propagate_once(&mut periscope) {
                    ValidatorOutcome::Contradiction | ValidatorOutcome::Stable => break,
                    ValidatorOutcome::Progress => continue,
                }
            }
            if field.has_contradiction() {
                break;
            }

            if let Some(cell_id) = field.min_entropy_cell() {
                collapse_cell(&mut field, cell_id);
            }

            let collapsed_now = count_collapsed(&field);
            if collapsed_now > last_collapsed {
                stalled = 0;
            } else {
                stalled += 1;
            }
            last_collapsed = collapsed_now;

            if stalled >= 3 {
                if let Some(cell_id) = field.min_entropy_cell() {
                    collapse_cell(&mut field, cell_id);
                }
                let collapsed_after_force = count_collapsed(&field);
                if collapsed_after_force > last_collapsed {
                    forced_without_improvement = 0;
                } else {
                    forced_without_improvement += 1;
                }
                last_collapsed = collapsed_after_force;
                stalled = 0;

                if forced_without_improvement >= 3 {
                    diagnostics.push(Diagnostic::system(
                        Position::new(0, 0, 0),
                        "no progress after repeated forced observations".to_string(),
                    ));
                    force_contradiction(&mut field);
                    break;
                }
            }
        }

        #[cfg(debug_assertions)]
        if let Some(log) = &self.log {
            if log.order() >= 3 {
                println!(
                    "[{}] finished after {} iterations, collapsed={}, contradiction={}",
                    log,
                    iteration,
                    field.is_fully_collapsed(),
                    field.has_contradiction()
                );
            }
        }

        Ok(WfcOutcome { field, periscope, diagnostics, iterations: iteration })
    }

    fn install_constraints(
        &self,
        field: &mut EntropyField,
        periscope: &mut Periscope,
        tokens: &Rc<Vec<Token>>,
        source: &Rc<[u8]>,
    ) {
        let cells: Vec<CellId> = field.cells().iter().map(|c| c.id).collect();
        if cells.len() < 2 {
            return;
        }

        let mut next_validator_id = 0usize;
        let mut register_contract = |periscope: &mut Periscope| {
            let id = ValidatorId(next_validator_id);
            next_validator_id += 1;
            periscope.add_contract(Contract::new(0, id, u32::MAX));
            id
        };

        for window in cells.windows(2) {
            let validator_id = register_contract(periscope);
            let validator = validators::adjacency(tokens.clone(), source.clone());
            field.add_constraint(
                ConstraintKind::Adjacency,
                vec![window[0], window[1]],
                format!("adjacency({}, {})", window[0], window[1]),
                validator_id,
                validator,
            );
        }

        for (i, token) in tokens.iter().enumerate() {
            if i + 1 >= tokens.len() {
                continue;
            }
            let next = &tokens[i + 1];
            if token.kind == TokenKind::Operator
                && token.len() == 1
                && next.kind == TokenKind::Operator
                && next.len() == 1
                && next.start == token.end
            {
                let validator_id = register_contract(periscope);
                let validator = validators::compound_operator(tokens.clone(), source.clone());
                field.add_constraint(
                    ConstraintKind::Grammar,
                    vec![cells[i], cells[i + 1]],
                    format!("compound-operator({}, {})", cells[i], cells[i + 1]),
                    validator_id,
                    validator,
                );
            }
        }

        let stream = TokenStream::new(tokens);
        let structural_cells: Vec<CellId> = (0..stream.filtered_len())
            .filter_map(|filtered_index| stream.original_index(filtered_index))
            .map(|original_index| cells[original_index])
            .collect();
        for window in structural_cells.windows(3) {
            let validator_id = register_contract(periscope);
            let validator = validators::sequence(self.config.strict_sequence);
            field.add_constraint(
                ConstraintKind::Sequence,
                window.to_vec(),
                format!("sequence({}, {}, {})", window[0], window[1], window[2]),
                validator_id,
                validator,
            );
        }

        if !structural_cells.is_empty() {
            if let Some(program) = self.registry.get("program") {
                let validator_id = register_contract(periscope);
                let validator = validators::pattern_match(
                    program,
                    self.registry.clone(),
                    tokens.clone(),
                    source.clone(),
                );
                field.add_constraint(
                    ConstraintKind::Grammar,
                    structural_cells.clone(),
                    "pattern(program)",
                    validator_id,
                    validator,
                );
            }
        }
    }
}

fn count_collapsed(field: &EntropyField) -> usize {
    field.cells().iter().filter(|c| c.is_collapsed()).count()
}

/// Collapses `cell_id` to its highest-probability remaining state, ties
/// broken by the smallest state identifier (spec §4.6, "Observe").
fn collapse_cell(field: &mut EntropyField, cell_id: CellId) {
    let chosen = {
        let cell = field.cell(cell_id);
        let max_weight = cell.live_states().map(|s| s.weight).max();
        max_weight.and_then(|weight| cell.live_states().filter(|s| s.weight == weight).map(|s| s.id).min())
    };
    let chosen_id = match chosen {
        Some(id) => id,
        None => return,
    };
    let rest: Vec<StateId> = field
        .cell(cell_id)
        .live_states()
        .map(|s| s.id)
        .filter(|&id| id != chosen_id)
        .collect();
    for state_id in rest {
        field.eliminate(cell_id, state_id);
    }
}

/// Forces the first still-uncollapsed, non-contradictory cell into
/// contradiction, turning an unresolvable stall into a genuine field
/// contradiction the caller can diagnose (spec §4.6 step 5, §7 "system").
fn force_contradiction(field: &mut EntropyField) {
    let target = field
        .cells()
        .iter()
        .find(|c| !c.is_collapsed() && !c.is_contradiction())
        .map(|c| c.id);
    if let Some(cell_id) = target {
        let live: Vec<StateId> = field.cell(cell_id).live_states().map(|s| s.id).collect();
        for state_id in live {
            field.eliminate(cell_id, state_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ExtractOptions;

    #[test]
    fn empty_input_collapses_immediately() {
        let driver = WfcDriver::new(DriverConfig::default());
        let outcome = driver.run("").expect("scan never fails");
        assert!(outcome.field.is_fully_collapsed());
        assert_eq!(outcome.field.cells().len(), 1); // eof only
    }

    #[test]
    fn single_identifier_round_trips() {
        let driver = WfcDriver::new(DriverConfig::default());
        let outcome = driver.run("x").expect("scan never fails");
        assert!(outcome.field.is_fully_collapsed());
        let extracted = outcome.field.extract(ExtractOptions::default());
        assert_eq!(extracted.tokens.len(), 2);
        assert_eq!(extracted.tokens[0].kind, TokenKind::Identifier);
    }

    #[test]
    fn tight_adjacency_produces_no_contradiction() {
        let driver = WfcDriver::new(DriverConfig::default());
        let outcome = driver.run("1+2").expect("scan never fails");
        assert!(!outcome.field.has_contradiction());
    }

    #[test]
    fn spaced_adjacency_within_bound_produces_no_contradiction() {
        let driver = WfcDriver::new(DriverConfig::default());
        let outcome = driver.run("1  +  2").expect("scan never fails");
        assert!(!outcome.field.has_contradiction());
    }

    #[test]
    fn unterminated_string_still_lets_the_driver_finish() {
        let driver = WfcDriver::new(DriverConfig::default());
        let outcome = driver.run("\"unterminated").expect("scan never fails");
        assert!(outcome.field.is_fully_collapsed() || outcome.field.has_contradiction());
    }

    #[test]
    fn if_statement_collapses_deterministically() {
        let driver = WfcDriver::new(DriverConfig::default());
        let outcome = driver.run("if (x) { }").expect("scan never fails");
        assert!(!outcome.field.has_contradiction());
        let extracted = outcome.field.extract(ExtractOptions::default());
        assert_eq!(extracted.tokens.len(), outcome.field.cells().len());
    }
}
