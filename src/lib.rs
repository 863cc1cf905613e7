//! A parsing engine that recognises a token stream by solving a constraint-satisfaction
//! problem over a lattice of token possibilities, in the manner of the Wave Function
//! Collapse (WFC) algorithm used for procedural texture/level synthesis.
//!
//! # Overview
//!
//! Traditional parsers commit to an interpretation of each lexeme as soon as it is
//! scanned (or use explicit backtracking/lookahead to defer the decision locally).
//! This crate instead seeds one *cell* per source token with every grammatically
//! admissible interpretation ("state") and repeatedly narrows the possibilities by
//! propagating constraints — adjacency, ordered sequence, compound-operator grouping,
//! and grammar-pattern constraints compiled from a small pattern library — until every
//! cell holds exactly one state (collapsed) or a cell is left with none (a contradiction,
//! reported as the first irreducible syntax error).
//!
//! # Example
//!
//! ```
//! use wfc_parse::{DriverConfig, ExtractOptions, WfcDriver};
//!
//! let source = "x";
//! let driver = WfcDriver::new(DriverConfig::default());
//! let outcome = driver.run(source).expect("scan should not fail");
//! let extracted = outcome.field.extract(ExtractOptions::default());
//! assert_eq!(extracted.tokens.len(), 2); // identifier("x"), eof
//! ```
//!
//! # Design
//!
//! The engine is organised leaf-first: a [scanner] turns source bytes into an ordered
//! [Token] stream; the [field] owns the dense array of [EntropyCell](cell::EntropyCell)s
//! and their candidate [EntropyState]s; the [constraint] store holds [Constraint]s built
//! by hand or compiled from the [pattern] library; the [periscope] resolves tokens to
//! cells and gates validator execution behind lifetime contracts; and the [driver]
//! schedules the propagate/observe fixed-point loop until the field is fully collapsed
//! or contradictory.
//!
//! # License
//! Provided under the MIT license, in keeping with the library this engine is built from.

mod code;
mod constraint;
pub mod driver;
mod error;
pub mod field;
pub mod pattern;
pub mod periscope;
pub mod cell;
pub mod ids;
mod log;
pub mod output;
pub mod position;
pub mod scanner;
pub mod state;
pub mod token;
pub mod token_stream;
pub mod validators;

pub use code::Code;
pub use constraint::{Constraint, ConstraintKind, ValidatorFn, ValidatorOutcome};
pub use driver::{DriverConfig, WfcDriver, WfcOutcome};
pub use error::{Diagnostic, Category, ImplementationError, ScanError, Severity};
pub use field::EntropyField;
pub use ids::{CellId, ConstraintId, StateId};
pub use log::Log;
pub use output::{ExtractOptions, ExtractedToken};
pub use pattern::{Pattern, PatternRegistry};
pub use periscope::{Contract, Periscope, ValidatorId};
pub use position::Position;
pub use scanner::Scanner;
pub use state::EntropyState;
pub use token::{Token, TokenKind};
pub use token_stream::TokenStream;

/// Hard upper bound on the size of a cell's candidate set. Kept conservative so
/// entropy arithmetic never has to worry about overflow; every built-in seed path
/// stays well below it.
pub(crate) const MAX_STATES_PER_CELL: usize = 64;
