// crates/agentops-orchestrator/src/lib.rs
// ============================================================================
// Crate: agentops-orchestrator
// Description: Drives one RCA job from `queued` through `done`/`error`.
// Purpose: Implement RO, the pipeline spanning §4.6 stages 0 through 8.
// Dependencies: agentops-broker, agentops-core, agentops-narrative,
//               agentops-store, agentops-strategy
// ============================================================================

//! ## Overview
//! [`RcaOrchestrator::run`] is the job-handler body a worker pool invokes
//! for one `rca_run_id`. It reads the evidence bundle once, classifies it,
//! gates on sufficiency, assembles a report, and persists it — announcing
//! progress at every stage boundary on both the store (authoritative) and
//! the broker (best-effort). A preflight check makes re-delivery of an
//! already-`done` job, or a job whose row has vanished, a silent no-op with
//! no terminal-status write; a top-level catch-all converts every other
//! stage failure into an `error` status (message prefixed `"Error: "`)
//! rather than propagating to the caller, per the rule that a job never
//! re-throws to its worker.
//!
//! `run` is synchronous and blocking by design: the orchestrator's own work
//! (SQLite reads/writes, template rendering) never awaits anything, so
//! callers on an async runtime should invoke it via `spawn_blocking` rather
//! than making this function `async` for no reason.

pub mod evidence_refs;
pub mod hypothesis;
pub mod metrics;
pub mod sufficiency;
pub mod ticket;

use std::sync::{Arc, Mutex};

use agentops_broker::Publisher;
use agentops_core::identifiers::{RcaRunId, ReportId};
use agentops_core::model::{ActionItem, RcaReport, RcaStatus};
use agentops_core::{LogEvent, LogLevel, LogSink, Timestamp};
use agentops_narrative::NarrativeEngine;
use agentops_store::{Store, StoreError};
use thiserror::Error;

/// Errors surfaced by [`RcaOrchestrator::run`]'s internal stages before the
/// catch-all converts them into a persisted `error` status.
#[derive(Debug, Error)]
enum StageError {
    #[error("rca run not found")]
    RcaRunNotFound,
    #[error("agent run not found for rca job")]
    AgentRunNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Shared resources one orchestrator invocation needs. Cheap to clone;
/// every field is already behind an `Arc`.
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub store: Arc<Mutex<Store>>,
    pub publisher: Arc<Publisher>,
    pub narrative: Arc<NarrativeEngine>,
    pub log: Arc<dyn LogSink>,
}

/// Drives the RCA pipeline for a single job.
pub struct RcaOrchestrator;

impl RcaOrchestrator {
    /// Runs the full pipeline for `rca_run_id`. Never returns an error to
    /// the caller: any stage failure is caught, logged, persisted onto the
    /// run as `status = error`, and announced on the progress channel.
    pub fn run(rca_run_id: &RcaRunId, deps: &OrchestratorDeps) {
        match Self::run_stages(rca_run_id, deps) {
            Ok(()) | Err(StageError::RcaRunNotFound) => {}
            Err(err) => {
                let message = err.to_string();
                deps.log.record(
                    &LogEvent::new(LogLevel::Error, "agentops_orchestrator::run", "rca job failed")
                        .with_fields(serde_json::json!({ "rca_run_id": rca_run_id.as_str(), "error": message })),
                );
                let store = deps.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                let _ = store.mark_error(rca_run_id, &message);
                deps.publisher.publish(rca_run_id, RcaStatus::Error, "error", 0, &format!("Error: {message}"));
            }
        }
    }

    fn run_stages(rca_run_id: &RcaRunId, deps: &OrchestratorDeps) -> Result<(), StageError> {
        // Stage 0: preflight. A job redelivered after completion is a silent
        // no-op. A row that vanished entirely (deleted, or never existed) is
        // also a silent return — not an error — matching the original's
        // `if not rca_run: logger.error(...); return` with no terminal
        // status transition.
        let existing = {
            let store = deps.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            store.get_rca_run(rca_run_id)?
        };
        let Some(run_row) = existing else {
            deps.log.record(
                &LogEvent::new(LogLevel::Error, "agentops_orchestrator::run", "rca run not found")
                    .with_fields(serde_json::json!({ "rca_run_id": rca_run_id.as_str() })),
            );
            return Err(StageError::RcaRunNotFound);
        };
        if run_row.status.is_terminal() {
            return Ok(());
        }

        // Stage 1: starting.
        {
            let store = deps.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            store.mark_running(rca_run_id)?;
        }
        Self::announce(deps, rca_run_id, RcaStatus::Running, "starting", 5, "Starting root-cause analysis");

        // Stage 2: collect evidence.
        Self::announce(deps, rca_run_id, RcaStatus::Running, "collecting_evidence", 30, "Collecting evidence");
        let bundle = {
            let store = deps.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            store.load_bundle(&run_row.run_id)?.ok_or(StageError::AgentRunNotFound)?
        };
        let evidence_index = evidence_refs::collect(&bundle);

        // Stage 3: classify.
        Self::announce(deps, rca_run_id, RcaStatus::Running, "classifying_failure", 55, "Classifying failure");
        let category = agentops_strategy::classify(&bundle);

        // Stage 4: sufficiency gate.
        let insufficient_reason = sufficiency::check(&bundle.run, bundle.tool_calls.len(), bundle.guardrails.len(), &evidence_index);
        let insufficient = insufficient_reason.is_some();

        // Stage 5: generate report (hypotheses + action items).
        Self::announce(deps, rca_run_id, RcaStatus::Running, "generating_report", 85, "Generating report");
        let hypotheses = if insufficient {
            Vec::new()
        } else {
            vec![hypothesis::assemble(&deps.narrative, category, &evidence_index)]
        };
        let action_items: Vec<ActionItem> = deps.narrative.action_items(category, insufficient);

        // Stage 6: metrics.
        let metrics_snapshot = metrics::compute(&bundle);

        // Stage 7: ticket fields.
        let jira_fields = ticket::build(category, &run_row.run_id, &hypotheses, &action_items, insufficient);

        let report = RcaReport {
            report_id: ReportId::generate(),
            rca_run_id: rca_run_id.clone(),
            run_id: run_row.run_id.clone(),
            generated_at: Timestamp::now(),
            category,
            insufficient_evidence: insufficient,
            insufficient_reason: insufficient_reason.map(str::to_owned),
            evidence_index,
            hypotheses,
            action_items,
            metrics_snapshot,
            jira_fields: Some(jira_fields),
        };

        // Stage 8: persist and complete.
        {
            let mut store = deps.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            store.save_report_and_complete(rca_run_id, &report)?;
        }
        Self::announce(deps, rca_run_id, RcaStatus::Done, "completed", 100, "RCA complete");
        deps.publisher.retire(rca_run_id);

        Ok(())
    }

    fn announce(deps: &OrchestratorDeps, rca_run_id: &RcaRunId, status: RcaStatus, step: &str, pct: i32, message: &str) {
        {
            let store = deps.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let _ = store.persist_progress(rca_run_id, step, pct, message);
        }
        deps.publisher.publish(rca_run_id, status, step, pct, message);
    }
}

#[cfg(test)]
mod tests {
    use agentops_core::identifiers::{CallId, EventId, StepId};
    use agentops_core::model::{
        AgentRunPayload, AgentStep, CostSummary, Environment, GuardrailEvent, GuardrailKind, Outcome, ToolCall,
    };
    use agentops_core::NoopLogSink;
    use agentops_store::Store;

    use super::*;

    fn bare_payload(run_id: &str, error_type: Option<&str>, error_message: Option<&str>) -> AgentRunPayload {
        AgentRunPayload {
            run_id: Some(run_id.into()),
            agent_name: "a".to_owned(),
            agent_version: "1".to_owned(),
            model: "m".to_owned(),
            environment: Environment::Dev,
            started_at: Timestamp::now(),
            ended_at: Timestamp::now(),
            status: Outcome::Failure,
            error_type: error_type.map(str::to_owned),
            error_message: error_message.map(str::to_owned),
            trace_id: None,
            correlation_ids: vec![],
            steps: vec![],
            tool_calls: vec![],
            guardrail_events: vec![],
            cost: CostSummary::default(),
        }
    }

    fn deps_with_payload(payload: AgentRunPayload) -> (OrchestratorDeps, agentops_core::identifiers::RcaRunId) {
        let mut store = Store::open_in_memory().unwrap();
        let run_id = payload.run_id.clone().unwrap();
        store.upsert_agent_run(payload).unwrap();
        let outcome = store.create_or_reuse_rca_run(&run_id).unwrap();
        let rca_run_id = outcome.rca_run_id().clone();
        let deps = OrchestratorDeps {
            store: Arc::new(Mutex::new(store)),
            publisher: Arc::new(Publisher::new()),
            narrative: Arc::new(NarrativeEngine::deterministic()),
            log: Arc::new(NoopLogSink),
        };
        (deps, rca_run_id)
    }

    fn deps_with_seeded_run(run_id: &str) -> (OrchestratorDeps, agentops_core::identifiers::RcaRunId) {
        deps_with_payload(bare_payload(run_id, Some("TimeoutError"), None))
    }

    #[test]
    fn run_completes_and_persists_a_report() {
        let (deps, rca_run_id) = deps_with_seeded_run("r1");
        RcaOrchestrator::run(&rca_run_id, &deps);
        let store = deps.store.lock().unwrap();
        let run = store.get_rca_run(&rca_run_id).unwrap().unwrap();
        assert_eq!(run.status, RcaStatus::Done);
        let report = store.get_report(&rca_run_id).unwrap().unwrap();
        assert!(!report.insufficient_evidence);
    }

    /// A vanished/unknown `rca_run_id` is a silent no-op: no terminal status
    /// is persisted and nothing is published on the progress channel.
    #[test]
    fn run_on_unknown_job_is_a_silent_no_op() {
        let (deps, _) = deps_with_seeded_run("r1");
        let missing_id = agentops_core::identifiers::RcaRunId::generate();
        let mut receiver = deps.publisher.subscribe(&missing_id);

        RcaOrchestrator::run(&missing_id, &deps);

        assert!(receiver.try_recv().is_err());
        let store = deps.store.lock().unwrap();
        assert!(store.get_rca_run(&missing_id).unwrap().is_none());
    }

    #[test]
    fn redelivery_of_a_done_job_is_a_silent_no_op() {
        let (deps, rca_run_id) = deps_with_seeded_run("r1");
        RcaOrchestrator::run(&rca_run_id, &deps);
        let store = deps.store.lock().unwrap();
        let first_report = store.get_report(&rca_run_id).unwrap().unwrap();
        drop(store);

        RcaOrchestrator::run(&rca_run_id, &deps);
        let store = deps.store.lock().unwrap();
        let run = store.get_rca_run(&rca_run_id).unwrap().unwrap();
        assert_eq!(run.status, RcaStatus::Done);
        let second_report = store.get_report(&rca_run_id).unwrap().unwrap();
        assert_eq!(first_report.report_id, second_report.report_id);
        assert_eq!(first_report.generated_at, second_report.generated_at);
    }

    /// Every `evidence_id` a hypothesis cites must appear in the report's
    /// own `evidence_index` — invariant 2.
    #[test]
    fn hypothesis_evidence_ids_are_a_subset_of_the_evidence_index() {
        let mut payload = bare_payload("test-sufficient-001", None, None);
        payload.steps = vec![AgentStep {
            step_id: StepId::from("s1"),
            name: "call_tool".to_owned(),
            status: Outcome::Failure,
            started_at: Timestamp::now(),
            ended_at: Timestamp::now(),
            input_summary: String::new(),
            output_summary: String::new(),
            retries: 1,
            latency_ms: 10,
        }];
        payload.tool_calls = vec![ToolCall {
            call_id: CallId::from("c1"),
            step_id: StepId::from("s1"),
            tool_name: "lookup_user".to_owned(),
            status: Outcome::Failure,
            args_json: serde_json::Value::Null,
            args_hash: String::new(),
            result_summary: String::new(),
            error_class: Some("ValidationError".to_owned()),
            error_message: Some("Missing required field: user_id".to_owned()),
            status_code: None,
            retries: 0,
            latency_ms: 5,
        }];
        payload.guardrail_events = vec![GuardrailEvent {
            event_id: EventId::from("g1"),
            kind: GuardrailKind::SchemaValidation,
            message: "schema rejected".to_owned(),
            step_id: Some(StepId::from("s1")),
            call_id: None,
            created_at: Timestamp::now(),
        }];

        let (deps, rca_run_id) = deps_with_payload(payload);
        RcaOrchestrator::run(&rca_run_id, &deps);

        let store = deps.store.lock().unwrap();
        let report = store.get_report(&rca_run_id).unwrap().unwrap();
        assert_eq!(report.category, agentops_core::model::Category::ToolSchemaMismatch);
        assert!(!report.insufficient_evidence);
        assert_eq!(report.hypotheses.len(), 1);
        assert!(!report.action_items.is_empty());
        let known_ids: std::collections::HashSet<_> = report.evidence_index.iter().map(|e| &e.evidence_id).collect();
        for hyp in &report.hypotheses {
            for ev_id in &hyp.evidence_ids {
                assert!(known_ids.contains(ev_id));
            }
        }
    }

    /// Scenario F: no tool calls, no guardrails, a generic run-level error.
    #[test]
    fn no_evidence_yields_insufficient_with_monitoring_action_item() {
        let mut payload = bare_payload("test-insufficient-001", None, Some("Internal Server Error"));
        payload.steps = vec![AgentStep {
            step_id: StepId::from("s1"),
            name: "plan".to_owned(),
            status: Outcome::Success,
            started_at: Timestamp::now(),
            ended_at: Timestamp::now(),
            input_summary: String::new(),
            output_summary: String::new(),
            retries: 0,
            latency_ms: 10,
        }];

        let (deps, rca_run_id) = deps_with_payload(payload);
        RcaOrchestrator::run(&rca_run_id, &deps);

        let store = deps.store.lock().unwrap();
        let report = store.get_report(&rca_run_id).unwrap().unwrap();
        assert!(report.insufficient_evidence);
        assert!(report.hypotheses.is_empty());
        assert!(report
            .action_items
            .iter()
            .any(|item| item.title == "Enable detailed tracing"));
    }

    /// Scenario G: a 429 tool call classifies rate-limited with the expected
    /// Jira summary prefix.
    #[test]
    fn rate_limited_tool_call_produces_expected_ticket_summary() {
        let mut payload = bare_payload("test-rate-limit-001", None, None);
        payload.tool_calls = vec![ToolCall {
            call_id: CallId::from("c1"),
            step_id: StepId::from("s1"),
            tool_name: "call_api".to_owned(),
            status: Outcome::Failure,
            args_json: serde_json::Value::Null,
            args_hash: String::new(),
            result_summary: String::new(),
            error_class: None,
            error_message: Some("Too many requests".to_owned()),
            status_code: Some(429),
            retries: 0,
            latency_ms: 5,
        }];

        let (deps, rca_run_id) = deps_with_payload(payload);
        RcaOrchestrator::run(&rca_run_id, &deps);

        let store = deps.store.lock().unwrap();
        let report = store.get_report(&rca_run_id).unwrap().unwrap();
        assert_eq!(report.category, agentops_core::model::Category::RateLimited);
        let jira = report.jira_fields.unwrap();
        assert!(jira.jira_summary.starts_with("[AgentOps RCA] Rate Limited - Run "));
    }

    /// Scenario H: a step with retries >= 3 and no failing tool calls
    /// classifies planner-loop.
    #[test]
    fn high_retries_with_no_failures_classify_planner_loop() {
        let mut payload = bare_payload("test-planner-loop-001", None, None);
        payload.steps = vec![AgentStep {
            step_id: StepId::from("s1"),
            name: "replan".to_owned(),
            status: Outcome::Success,
            started_at: Timestamp::now(),
            ended_at: Timestamp::now(),
            input_summary: String::new(),
            output_summary: String::new(),
            retries: 3,
            latency_ms: 10,
        }];

        let (deps, rca_run_id) = deps_with_payload(payload);
        RcaOrchestrator::run(&rca_run_id, &deps);

        let store = deps.store.lock().unwrap();
        let report = store.get_report(&rca_run_id).unwrap().unwrap();
        assert_eq!(report.category, agentops_core::model::Category::PlannerLoop);
    }
}
