// crates/agentops-core/src/identifiers.rs
// ============================================================================
// Module: AgentOps Identifiers
// Description: Opaque identifiers for agent runs, RCA runs, and evidence rows.
// Purpose: Strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! All identifiers in AgentOps are opaque UTF-8 strings on the wire. Unlike a
//! database primary key, callers may supply their own id at ingest time (see
//! [`RunId`]); server-generated ids use UUIDv4.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generates a fresh server-side identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the owned string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(RunId, "Identifier for an ingested agent run.");
string_id!(StepId, "Identifier for a single step within an agent run.");
string_id!(CallId, "Identifier for a tool call within a step.");
string_id!(EventId, "Identifier for a guardrail event.");
string_id!(RcaRunId, "Identifier for an RCA job instance.");
string_id!(ReportId, "Identifier for a generated RCA report.");
string_id!(EvidenceId, "Identifier for an evidence reference inside a report.");
string_id!(HypothesisId, "Identifier for a hypothesis inside a report.");
string_id!(ActionId, "Identifier for an action item inside a report.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display() {
        let id = RunId::new("run-123");
        assert_eq!(id.as_str(), "run-123");
        assert_eq!(id.to_string(), "run-123");
    }

    #[test]
    fn generated_ids_are_non_empty_and_distinct() {
        let a = RcaRunId::generate();
        let b = RcaRunId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn serializes_transparently() {
        let id = ReportId::new("rep-1");
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"rep-1\"");
    }
}
