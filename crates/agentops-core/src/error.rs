// crates/agentops-core/src/error.rs
// ============================================================================
// Module: AgentOps Core Errors
// Description: Error type shared by every crate for domain-level failures.
// Purpose: Give downstream crates a single `From` target for `?`.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors that originate from domain types themselves (parsing, bounds)
/// rather than from a particular transport or storage backend.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stored or wire enum carried a value outside its closed set.
    #[error("invalid value for {field}: {value}")]
    InvalidEnumValue { field: &'static str, value: String },

    /// A required field was missing or empty where the domain model
    /// requires content.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
