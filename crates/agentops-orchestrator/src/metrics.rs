// crates/agentops-orchestrator/src/metrics.rs
// ============================================================================
// Module: Metrics Snapshot
// Description: Aggregate numbers computed once per report.
// Purpose: Implement RO's §4.6.3 metrics snapshot.
// Dependencies: agentops-core
// ============================================================================

use std::collections::HashMap;

use agentops_core::model::{EvidenceBundle, MetricsSnapshot};

/// Computes the metrics snapshot for a report from the full evidence bundle.
#[must_use]
pub fn compute(bundle: &EvidenceBundle) -> MetricsSnapshot {
    let mut failure_counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen_order: Vec<&str> = Vec::new();
    for call in bundle.tool_calls.iter().filter(|c| c.status.is_failure()) {
        if !failure_counts.contains_key(call.tool_name.as_str()) {
            first_seen_order.push(call.tool_name.as_str());
        }
        *failure_counts.entry(call.tool_name.as_str()).or_insert(0) += 1;
    }

    let top_failing_tool = first_seen_order
        .into_iter()
        .max_by_key(|name| failure_counts[name])
        .map(str::to_owned);

    let max_step_latency_ms = bundle.steps.iter().map(|s| s.latency_ms).max().unwrap_or(0);

    let total_retries: i64 = bundle.steps.iter().map(|s| s.retries).sum::<i64>()
        + bundle.tool_calls.iter().map(|c| c.retries).sum::<i64>();

    MetricsSnapshot {
        top_failing_tool,
        max_step_latency_ms,
        total_retries,
        total_cost_usd: bundle.run.cost.total_cost_usd,
    }
}
