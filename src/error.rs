use crate::position::Position;
use std::fmt::{Display, Formatter};

/// Severity of a reported [Diagnostic].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

/// Which subsystem a [Diagnostic] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Lexical,
    Syntax,
    Semantic,
    System,
}

/// A single reportable event: a scanner error, a contradiction, or an internal
/// (system) failure. The WFC driver reports at most one contradiction per cell
/// and surfaces only the first failing cell in source order (spec §7).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub position: Position,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, category: Category, position: Position, message: String) -> Self {
        Self {
            severity,
            category,
            position,
            message,
        }
    }

    pub fn lexical(position: Position, message: String) -> Self {
        Self::new(Severity::Error, Category::Lexical, position, message)
    }

    pub fn syntax(position: Position, message: String) -> Self {
        Self::new(Severity::Error, Category::Syntax, position, message)
    }

    pub fn system(position: Position, message: String) -> Self {
        Self::new(Severity::Fatal, Category::System, position, message)
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} {:?} @ {}: {}",
            self.severity, self.category, self.position, self.message
        )
    }
}

/// Error returned by the scanner when it cannot make forward progress at all
/// (practically unreachable: the scanner always emits an `invalid` token and
/// resumes, per spec §4.1, so this is reserved for buffer-level failures).
#[derive(Debug, Clone)]
pub struct ScanError {
    pub position: Position,
    pub message: String,
}

impl ScanError {
    pub fn new(position: Position, message: String) -> Self {
        Self { position, message }
    }
}

impl Display for ScanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScanError @ {}: {}", self.position, self.message)
    }
}

/// Error returned when a [crate::Constraint] or [crate::Pattern] is malformed
/// in a way that cannot be recovered from at runtime (e.g. an empty cell list).
#[derive(Debug)]
pub struct ImplementationError {
    pub what: String,
    pub message: String,
}

impl ImplementationError {
    pub fn new(what: String, message: String) -> Self {
        Self { what, message }
    }
}

impl Display for ImplementationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ImplementationError: {}-{}", self.what, self.message)
    }
}

impl std::error::Error for ImplementationError {}
impl std::error::Error for ScanError {}
