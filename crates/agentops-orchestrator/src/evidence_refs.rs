// crates/agentops-orchestrator/src/evidence_refs.rs
// ============================================================================
// Module: Evidence Collection
// Description: Builds the report's evidence_index from a telemetry bundle.
// Purpose: Implement RO stage 2 / §4.6.2.
// Dependencies: agentops-core
// ============================================================================

use agentops_core::model::{EvidenceBundle, EvidenceKind, EvidenceRef};

/// Maximum snippet length taken from any single source field.
const SNIPPET_LEN: usize = 200;

/// Builds one [`EvidenceRef`] per failed step, failed tool call, and every
/// guardrail event (regardless of outcome), in that order.
#[must_use]
pub fn collect(bundle: &EvidenceBundle) -> Vec<EvidenceRef> {
    let mut refs = Vec::new();

    for step in bundle.steps.iter().filter(|s| s.status.is_failure()) {
        refs.push(EvidenceRef {
            evidence_id: format!("ev_step_{}", step.step_id).into(),
            kind: EvidenceKind::Step,
            ref_id: step.step_id.to_string(),
            title: step.name.clone(),
            snippet: truncate(&step.output_summary),
            attributes: serde_json::json!({
                "latency_ms": step.latency_ms,
                "retries": step.retries,
            }),
        });
    }

    for call in bundle.tool_calls.iter().filter(|c| c.status.is_failure()) {
        refs.push(EvidenceRef {
            evidence_id: format!("ev_tool_{}", call.call_id).into(),
            kind: EvidenceKind::ToolCall,
            ref_id: call.call_id.to_string(),
            title: call.tool_name.clone(),
            snippet: truncate(call.error_message.as_deref().unwrap_or("")),
            attributes: serde_json::json!({
                "error_class": call.error_class,
                "status_code": call.status_code,
                "latency_ms": call.latency_ms,
            }),
        });
    }

    for event in &bundle.guardrails {
        refs.push(EvidenceRef {
            evidence_id: format!("ev_guard_{}", event.event_id).into(),
            kind: EvidenceKind::Guardrail,
            ref_id: event.event_id.to_string(),
            title: format!("Guardrail: {}", event.kind.as_str()),
            snippet: truncate(&event.message),
            attributes: serde_json::json!({ "type": event.kind.as_str() }),
        });
    }

    refs
}

fn truncate(s: &str) -> String {
    s.chars().take(SNIPPET_LEN).collect()
}
