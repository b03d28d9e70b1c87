// crates/agentops-core/src/logging.rs
// ============================================================================
// Module: AgentOps Logging
// Description: Structured log sink abstraction shared by every crate.
// Purpose: Provide a pluggable logging seam without a hard tracing/log dep.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! AgentOps has no hard dependency on `tracing` or `log`. Instead, every
//! component that wants to emit a diagnostic takes an `Arc<dyn LogSink>` and
//! calls [`LogSink::record`] with a structured [`LogEvent`]. This mirrors how
//! observability is wired in the rest of the workspace (metrics and audit
//! sinks as injected trait objects) and keeps the core crates free of a
//! specific logging backend's API surface.

use std::io::Write;

/// Severity of a [`LogEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    /// Parses a `log_level` configuration value, defaulting to `Info` for
    /// anything unrecognized rather than failing configuration load.
    #[must_use]
    pub fn parse_or_info(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "debug" => Self::Debug,
            _ => Self::Info,
        }
    }
}

/// A single structured diagnostic record.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: LogLevel,
    /// Dotted module/component name, e.g. `"agentops_orchestrator::run"`.
    pub target: &'static str,
    pub message: String,
    /// Arbitrary structured fields attached to the event.
    pub fields: serde_json::Value,
}

impl LogEvent {
    #[must_use]
    pub fn new(level: LogLevel, target: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            target,
            message: message.into(),
            fields: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: serde_json::Value) -> Self {
        self.fields = fields;
        self
    }
}

/// Log sink for structured diagnostics.
pub trait LogSink: Send + Sync {
    /// Records a log event. Implementations must not panic.
    fn record(&self, event: &LogEvent);
}

/// No-op log sink, used in tests and whenever logging is disabled.
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    fn record(&self, _event: &LogEvent) {}
}

/// Writes one JSON line per event to stderr, filtered by a minimum level.
pub struct StderrLogSink {
    min_level: LogLevel,
}

impl StderrLogSink {
    #[must_use]
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl LogSink for StderrLogSink {
    fn record(&self, event: &LogEvent) {
        if event.level > self.min_level {
            return;
        }
        let line = serde_json::json!({
            "level": event.level.as_str(),
            "target": event.target,
            "message": event.message,
            "fields": event.fields,
        });
        let mut stderr = std::io::stderr();
        // Best-effort: a logging failure must never surface as an application error.
        let _ = writeln!(stderr, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_info_defaults_on_garbage() {
        assert_eq!(LogLevel::parse_or_info("nonsense"), LogLevel::Info);
        assert_eq!(LogLevel::parse_or_info("DEBUG"), LogLevel::Debug);
    }

    #[test]
    fn noop_sink_never_panics() {
        let sink = NoopLogSink;
        sink.record(&LogEvent::new(LogLevel::Error, "test", "boom"));
    }

    #[test]
    fn stderr_sink_filters_by_level() {
        let sink = StderrLogSink::new(LogLevel::Warn);
        // Below the threshold; exercised only for panic-freedom, output is not captured.
        sink.record(&LogEvent::new(LogLevel::Debug, "test", "quiet"));
        sink.record(&LogEvent::new(LogLevel::Error, "test", "loud"));
    }
}
