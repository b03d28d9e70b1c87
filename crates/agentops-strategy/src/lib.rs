// crates/agentops-strategy/src/lib.rs
// ============================================================================
// Crate: agentops-strategy
// Description: Deterministic failure classification over a telemetry bundle.
// Purpose: Pure rule cascade mapping evidence to one of eight Categories.
// Dependencies: agentops-core
// ============================================================================

//! ## Overview
//! This is a closed, ordered rule set, not a dynamic-dispatch plugin
//! library: a tagged `match`/`if` cascade over plain data, in input order,
//! first match wins. `classify` performs no I/O and is referentially
//! transparent — the same bundle always yields the same [`Category`].

use agentops_core::model::{AgentStep, Category, EvidenceBundle, GuardrailKind, ToolCall};

/// Minimum per-step retry count that elects [`Category::PlannerLoop`].
const PLANNER_LOOP_RETRY_THRESHOLD: i64 = 3;

/// Maximum `output_summary` length (chars) below which a thin retrieval/
/// search step elects [`Category::RetrievalEmpty`].
const RETRIEVAL_EMPTY_OUTPUT_THRESHOLD: usize = 50;

/// Classifies a run's failure from its full evidence bundle.
///
/// Rule order (first match wins):
/// 1. Scan failed tool calls in input order for rate-limit, schema, permission,
///    or timeout signals.
/// 2. Any `schema_validation` guardrail elects [`Category::ToolSchemaMismatch`].
/// 3. Any step with `retries >= 3` elects [`Category::PlannerLoop`].
/// 4. No tool calls, no run-level `error_type`, and a thin retrieval/search
///    step elects [`Category::RetrievalEmpty`].
/// 5. A run-level `error_type` containing "timeout" elects [`Category::Timeout`].
/// 6. Otherwise [`Category::Unknown`].
#[must_use]
pub fn classify(bundle: &EvidenceBundle) -> Category {
    for call in bundle.tool_calls.iter().filter(|c| c.status.is_failure()) {
        if let Some(category) = classify_failed_tool_call(call) {
            return category;
        }
    }

    if bundle
        .guardrails
        .iter()
        .any(|g| g.kind == GuardrailKind::SchemaValidation)
    {
        return Category::ToolSchemaMismatch;
    }

    if bundle.steps.iter().map(|s| s.retries).max().unwrap_or(0) >= PLANNER_LOOP_RETRY_THRESHOLD {
        return Category::PlannerLoop;
    }

    if bundle.tool_calls.is_empty()
        && bundle.run.error_type.is_none()
        && bundle.steps.iter().any(is_thin_retrieval_step)
    {
        return Category::RetrievalEmpty;
    }

    if contains_ci(bundle.run.error_type.as_deref(), "timeout") {
        return Category::Timeout;
    }

    Category::Unknown
}

fn classify_failed_tool_call(call: &ToolCall) -> Option<Category> {
    let message = call.error_message.as_deref();
    let class = call.error_class.as_deref();

    if call.status_code == Some(429) || contains_ci(message, "rate limit") {
        return Some(Category::RateLimited);
    }

    if contains_ci(class, "schema")
        || contains_any_ci(message, &["validation", "schema", "unexpected", "missing required"])
    {
        return Some(Category::ToolSchemaMismatch);
    }

    if matches!(call.status_code, Some(401) | Some(403))
        || contains_any_ci(message, &["permission", "unauthorized", "forbidden", "access denied"])
    {
        return Some(Category::ToolPermission);
    }

    if contains_ci(class, "timeout") || contains_ci(message, "timeout") {
        return Some(Category::Timeout);
    }

    None
}

fn is_thin_retrieval_step(step: &AgentStep) -> bool {
    let name_matches = contains_ci(Some(step.name.as_str()), "retriev") || contains_ci(Some(step.name.as_str()), "search");
    name_matches && step.output_summary.chars().count() < RETRIEVAL_EMPTY_OUTPUT_THRESHOLD
}

/// Case-insensitive substring match; `None`/empty never match anything.
fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    match haystack {
        Some(h) if !h.is_empty() => h.to_lowercase().contains(&needle.to_lowercase()),
        _ => false,
    }
}

fn contains_any_ci(haystack: Option<&str>, needles: &[&str]) -> bool {
    needles.iter().any(|n| contains_ci(haystack, n))
}

#[cfg(test)]
mod tests {
    use agentops_core::model::{AgentRun, CostSummary, Environment, GuardrailEvent, Outcome};
    use agentops_core::Timestamp;

    use super::*;

    fn empty_bundle() -> EvidenceBundle {
        EvidenceBundle {
            run: AgentRun {
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
            },
            steps: vec![],
            tool_calls: vec![],
            guardrails: vec![],
        }
    }

    fn failed_tool_call(error_class: Option<&str>, error_message: Option<&str>, status_code: Option<i64>) -> ToolCall {
        ToolCall {
            call_id: "c1".into(),
            step_id: "s1".into(),
            tool_name: "search".to_owned(),
            status: Outcome::Failure,
            args_json: serde_json::Value::Null,
            args_hash: String::new(),
            result_summary: String::new(),
            error_class: error_class.map(str::to_owned),
            error_message: error_message.map(str::to_owned),
            status_code,
            retries: 0,
            latency_ms: 0,
        }
    }

    #[test]
    fn no_evidence_classifies_unknown() {
        assert_eq!(classify(&empty_bundle()), Category::Unknown);
    }

    #[test]
    fn rate_limit_status_code_wins() {
        let mut bundle = empty_bundle();
        bundle.tool_calls.push(failed_tool_call(None, None, Some(429)));
        assert_eq!(classify(&bundle), Category::RateLimited);
    }

    #[test]
    fn rate_limit_beats_timeout_when_both_present() {
        let mut bundle = empty_bundle();
        bundle.tool_calls.push(failed_tool_call(Some("TimeoutError"), None, Some(429)));
        assert_eq!(classify(&bundle), Category::RateLimited);
    }

    #[test]
    fn schema_validation_guardrail_elects_schema_mismatch() {
        let mut bundle = empty_bundle();
        bundle.guardrails.push(GuardrailEvent {
            event_id: "e1".into(),
            kind: GuardrailKind::SchemaValidation,
            message: "bad shape".to_owned(),
            step_id: None,
            call_id: None,
            created_at: Timestamp::now(),
        });
        assert_eq!(classify(&bundle), Category::ToolSchemaMismatch);
    }

    #[test]
    fn high_retries_elect_planner_loop() {
        let mut bundle = empty_bundle();
        bundle.steps.push(AgentStep {
            step_id: "s1".into(),
            name: "plan".to_owned(),
            status: Outcome::Failure,
            started_at: Timestamp::now(),
            ended_at: Timestamp::now(),
            input_summary: String::new(),
            output_summary: String::new(),
            retries: 3,
            latency_ms: 0,
        });
        assert_eq!(classify(&bundle), Category::PlannerLoop);
    }

    #[test]
    fn thin_retrieval_step_elects_retrieval_empty() {
        let mut bundle = empty_bundle();
        bundle.steps.push(AgentStep {
            step_id: "s1".into(),
            name: "retrieve_docs".to_owned(),
            status: Outcome::Failure,
            started_at: Timestamp::now(),
            ended_at: Timestamp::now(),
            input_summary: String::new(),
            output_summary: "no results".to_owned(),
            retries: 0,
            latency_ms: 0,
        });
        assert_eq!(classify(&bundle), Category::RetrievalEmpty);
    }

    #[test]
    fn run_level_timeout_error_type_elects_timeout() {
        let mut bundle = empty_bundle();
        bundle.run.error_type = Some("TimeoutError".to_owned());
        assert_eq!(classify(&bundle), Category::Timeout);
    }

    proptest::proptest! {
        #[test]
        fn status_429_always_elects_rate_limited_regardless_of_message(msg in "[a-zA-Z ]{0,40}") {
            let mut bundle = empty_bundle();
            bundle.tool_calls.push(failed_tool_call(None, Some(&msg), Some(429)));
            proptest::prop_assert_eq!(classify(&bundle), Category::RateLimited);
        }
    }
}
