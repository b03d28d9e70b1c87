// crates/agentops-orchestrator/src/sufficiency.rs
// ============================================================================
// Module: Evidence Sufficiency Gate
// Description: Decides whether a run's telemetry supports a root-cause claim.
// Purpose: Implement RO stage 4 / §4.6.1.
// Dependencies: agentops-core
// ============================================================================

use agentops_core::model::{EvidenceKind, EvidenceRef};
use agentops_core::model::AgentRun;

/// Fixed reason string used whenever the gate is insufficient.
pub const INSUFFICIENT_REASON: &str = "Limited telemetry: no tool failures or specific error details captured";

/// Returns `Some(reason)` when evidence is insufficient to support a
/// hypothesis, `None` when sufficient.
///
/// Insufficient iff either:
/// - the run has no tool calls, no run-level `error_type`, and no guardrail
///   events (checked via the already-built evidence index and the run's
///   tool-call count, since guardrails always contribute an index entry); or
/// - the run's `error_message` contains "internal server error"
///   (case-insensitive) and no tool-call evidence exists in the index.
#[must_use]
pub fn check(run: &AgentRun, tool_call_count: usize, guardrail_count: usize, evidence_index: &[EvidenceRef]) -> Option<&'static str> {
    let has_tool_call_evidence = evidence_index.iter().any(|e| e.kind == EvidenceKind::ToolCall);

    if tool_call_count == 0 && run.error_type.is_none() && guardrail_count == 0 {
        return Some(INSUFFICIENT_REASON);
    }

    let mentions_internal_server_error = run
        .error_message
        .as_deref()
        .map(|m| m.to_lowercase().contains("internal server error"))
        .unwrap_or(false);

    if mentions_internal_server_error && !has_tool_call_evidence {
        return Some(INSUFFICIENT_REASON);
    }

    None
}

#[cfg(test)]
mod tests {
    use agentops_core::model::{CostSummary, Environment, Outcome};
    use agentops_core::Timestamp;

    use super::*;

    fn base_run() -> AgentRun {
        AgentRun {
            run_id: "r1".into(),
            agent_name: "a".to_owned(),
            agent_version: "1".to_owned(),
            model: "m".to_owned(),
            environment: Environment::Dev,
            started_at: Timestamp::now(),
            ended_at: Timestamp::now(),
            status: Outcome::Failure,
            error_type: None,
            error_message: None,
            trace_id: None,
            correlation_ids: vec![],
            cost: CostSummary::default(),
            created_at: Timestamp::now(),
        }
    }

    #[test]
    fn no_signal_at_all_is_insufficient() {
        assert!(check(&base_run(), 0, 0, &[]).is_some());
    }

    #[test]
    fn internal_server_error_without_tool_evidence_is_insufficient() {
        let mut run = base_run();
        run.error_message = Some("Internal Server Error".to_owned());
        assert!(check(&run, 0, 0, &[]).is_some());
    }

    #[test]
    fn tool_call_present_is_sufficient() {
        let run = base_run();
        assert!(check(&run, 1, 0, &[]).is_none());
    }
}
