// crates/agentops-core/src/lib.rs
// ============================================================================
// Crate: agentops-core
// Description: Shared domain model, identifiers, timestamps, and ambient
//              error/logging types for the AgentOps RCA workspace.
// ============================================================================

pub mod error;
pub mod identifiers;
pub mod logging;
pub mod model;
pub mod timestamp;

pub use error::CoreError;
pub use identifiers::{
    ActionId, CallId, EventId, EvidenceId, HypothesisId, RcaRunId, ReportId, RunId, StepId,
};
pub use logging::{LogEvent, LogLevel, LogSink, NoopLogSink, StderrLogSink};
pub use timestamp::Timestamp;
