// crates/agentops-core/src/timestamp.rs
// ============================================================================
// Module: AgentOps Timestamp
// Description: UTC wall-clock timestamp with a stable RFC3339 wire form.
// Purpose: Give every crate one timestamp type instead of ad-hoc chrono use.
// Dependencies: chrono, serde
// ============================================================================

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in time, always UTC, serializing as RFC3339 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Wraps an existing `chrono` timestamp.
    #[must_use]
    pub const fn new(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// The current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `chrono` value.
    #[must_use]
    pub const fn inner(&self) -> DateTime<Utc> {
        self.0
    }

    /// Milliseconds elapsed since `other`; saturates rather than panicking
    /// if `other` is later than `self`.
    #[must_use]
    pub fn millis_since(&self, other: &Self) -> i64 {
        self.0.signed_duration_since(other.0).num_milliseconds()
    }

    /// `self - duration`, used for idempotency-window lookups.
    #[must_use]
    pub fn minus_minutes(&self, minutes: i64) -> Self {
        Self(self.0 - chrono::Duration::minutes(minutes))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_since_is_non_negative_for_forward_intervals() {
        let start = Timestamp::now();
        let end = Timestamp::new(start.inner() + chrono::Duration::milliseconds(250));
        assert_eq!(end.millis_since(&start), 250);
    }

    #[test]
    fn minus_minutes_moves_backwards() {
        let now = Timestamp::now();
        let earlier = now.minus_minutes(10);
        assert!(earlier < now);
    }
}
