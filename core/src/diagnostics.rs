//! Structured warning events.
//!
//! Soft conditions (deprecated-field access, unexpected construction
//! keys) never block the triggering operation. Instead each one
//! produces a [`Diagnostic`] that is logged through `tracing::warn!`
//! and buffered on the owning instance, where callers can collect it
//! with `Instance::drain_diagnostics`.

use std::fmt;

use serde::Serialize;

/// Kind of soft condition a [`Diagnostic`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// A deprecated field was read.
    DeprecatedAccess,
    /// A provided key does not exist in the schema; it was ignored.
    UnexpectedKey,
}

/// One warning event tied to a field of a configuration type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// What happened.
    pub kind: DiagnosticKind,
    /// Name of the configuration type.
    pub type_name: String,
    /// Field the event refers to.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn new(
        kind: DiagnosticKind,
        type_name: &str,
        field: &str,
        message: String,
    ) -> Self {
        Self {
            kind,
            type_name: type_name.to_string(),
            field: field.to_string(),
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
