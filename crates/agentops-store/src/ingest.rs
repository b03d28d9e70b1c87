// crates/agentops-store/src/ingest.rs
// ============================================================================
// Module: Ingest & Summary Queries
// Description: Full-replace agent-run upsert and read-side summary/timeline.
// Purpose: Implement the II component's write path and simple read views.
// Dependencies: rusqlite, serde_json
// ============================================================================

use agentops_core::identifiers::{CallId, RunId, StepId};
use agentops_core::model::{
    AgentRunPayload, AgentRunSummary, Environment, GuardrailKind, Outcome, TimelineEvent, TimelineEventKind,
};
use agentops_core::Timestamp;
use rusqlite::{params, OptionalExtension};

use crate::{Store, StoreError};

impl Store {
    /// Upserts an agent run and all of its children, atomically. If a row
    /// with this `run_id` already exists, its scalar fields are overwritten
    /// and every existing child row is deleted before the payload's
    /// children are inserted — a full-replace, not a merge.
    ///
    /// Ordering inside the transaction: the parent row is written first (an
    /// `INSERT ... ON CONFLICT DO UPDATE`, so it exists as a foreign-key
    /// target even on first ingest and keeps its original `created_at` on
    /// re-ingest), then every existing child row is deleted before the new
    /// rows of that kind are inserted, so no statement in the transaction
    /// ever observes a dangling reference.
    ///
    /// # Errors
    /// Returns [`StoreError`] on any underlying database failure; the whole
    /// transaction rolls back, leaving prior state untouched.
    pub fn upsert_agent_run(&mut self, payload: AgentRunPayload) -> Result<RunId, StoreError> {
        let run_id = payload.run_id.clone().unwrap_or_else(RunId::generate);
        let created_at = Timestamp::now();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO agent_runs
                (run_id, agent_name, agent_version, model, environment, started_at, ended_at,
                 status, error_type, error_message, trace_id, correlation_ids, cost_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                 COALESCE((SELECT created_at FROM agent_runs WHERE run_id = ?1), ?14))
             ON CONFLICT(run_id) DO UPDATE SET
                agent_name = excluded.agent_name,
                agent_version = excluded.agent_version,
                model = excluded.model,
                environment = excluded.environment,
                started_at = excluded.started_at,
                ended_at = excluded.ended_at,
                status = excluded.status,
                error_type = excluded.error_type,
                error_message = excluded.error_message,
                trace_id = excluded.trace_id,
                correlation_ids = excluded.correlation_ids,
                cost_json = excluded.cost_json",
            params![
                run_id.as_str(),
                payload.agent_name,
                payload.agent_version,
                payload.model,
                environment_str(payload.environment),
                payload.started_at.to_string(),
                payload.ended_at.to_string(),
                outcome_str(payload.status),
                payload.error_type,
                payload.error_message,
                payload.trace_id,
                serde_json::to_string(&payload.correlation_ids).unwrap_or_default(),
                serde_json::to_string(&payload.cost).unwrap_or_default(),
                created_at.to_string(),
            ],
        )?;

        tx.execute("DELETE FROM agent_steps WHERE run_id = ?1", params![run_id.as_str()])?;
        tx.execute("DELETE FROM tool_calls WHERE run_id = ?1", params![run_id.as_str()])?;
        tx.execute("DELETE FROM guardrail_events WHERE run_id = ?1", params![run_id.as_str()])?;

        for step in &payload.steps {
            let step = step.clone().with_derived_latency();
            tx.execute(
                "INSERT INTO agent_steps
                    (step_id, run_id, name, status, started_at, ended_at, input_summary,
                     output_summary, retries, latency_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    step.step_id.as_str(),
                    run_id.as_str(),
                    step.name,
                    outcome_str(step.status),
                    step.started_at.to_string(),
                    step.ended_at.to_string(),
                    step.input_summary,
                    step.output_summary,
                    step.retries,
                    step.latency_ms,
                ],
            )?;
        }

        for call in &payload.tool_calls {
            let call = call.clone().with_bounded_summary();
            tx.execute(
                "INSERT INTO tool_calls
                    (call_id, run_id, step_id, tool_name, status, args_json, args_hash,
                     result_summary, error_class, error_message, status_code, retries, latency_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    call.call_id.as_str(),
                    run_id.as_str(),
                    call.step_id.as_str(),
                    call.tool_name,
                    outcome_str(call.status),
                    serde_json::to_string(&call.args_json).unwrap_or_default(),
                    call.args_hash,
                    call.result_summary,
                    call.error_class,
                    call.error_message,
                    call.status_code,
                    call.retries,
                    call.latency_ms,
                ],
            )?;
        }

        for event in &payload.guardrail_events {
            tx.execute(
                "INSERT INTO guardrail_events
                    (event_id, run_id, type, message, step_id, call_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    event.event_id.as_str(),
                    run_id.as_str(),
                    guardrail_kind_str(event.kind),
                    event.message,
                    event.step_id.as_ref().map(StepId::as_str),
                    event.call_id.as_ref().map(CallId::as_str),
                    event.created_at.to_string(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(run_id)
    }

    /// Returns the response body for `GET /agent-runs/{run_id}`, or `None`
    /// if the run does not exist.
    ///
    /// # Errors
    /// Returns [`StoreError`] on a database failure.
    pub fn get_agent_run_summary(&self, run_id: &RunId) -> Result<Option<AgentRunSummary>, StoreError> {
        let row: Option<(String, String, String, String)> = self
            .conn
            .query_row(
                "SELECT agent_name, status, started_at, ended_at FROM agent_runs WHERE run_id = ?1",
                params![run_id.as_str()],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?;

        let Some((agent_name, status, started_at, ended_at)) = row else {
            return Ok(None);
        };

        let step_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM agent_steps WHERE run_id = ?1",
            params![run_id.as_str()],
            |r| r.get(0),
        )?;
        let tool_call_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tool_calls WHERE run_id = ?1",
            params![run_id.as_str()],
            |r| r.get(0),
        )?;
        let guardrail_event_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM guardrail_events WHERE run_id = ?1",
            params![run_id.as_str()],
            |r| r.get(0),
        )?;

        Ok(Some(AgentRunSummary {
            run_id: run_id.clone(),
            agent_name,
            status: parse_outcome(&status)?,
            started_at: parse_timestamp(&started_at)?,
            ended_at: parse_timestamp(&ended_at)?,
            step_count: step_count as usize,
            tool_call_count: tool_call_count as usize,
            guardrail_event_count: guardrail_event_count as usize,
        }))
    }

    /// Returns the merged, timestamp-ordered timeline for a run, or `None`
    /// if the run does not exist (distinct from an empty `Vec`, which means
    /// the run exists but has no children yet).
    ///
    /// # Errors
    /// Returns [`StoreError`] on a database failure.
    pub fn get_timeline(&self, run_id: &RunId) -> Result<Option<Vec<TimelineEvent>>, StoreError> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM agent_runs WHERE run_id = ?1",
                params![run_id.as_str()],
                |r| r.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        let mut events = Vec::new();

        let mut step_started_at = std::collections::HashMap::new();
        let mut stmt = self.conn.prepare(
            "SELECT step_id, name, status, started_at, input_summary, output_summary, retries, latency_ms
             FROM agent_steps WHERE run_id = ?1",
        )?;
        let rows = stmt.query_map(params![run_id.as_str()], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, String>(5)?,
                r.get::<_, i64>(6)?,
                r.get::<_, i64>(7)?,
            ))
        })?;
        for row in rows {
            let (step_id, name, status, started_at, input_summary, output_summary, retries, latency_ms) = row?;
            let ts = parse_timestamp(&started_at)?;
            step_started_at.insert(step_id.clone(), ts);
            events.push(TimelineEvent {
                event_id: step_id,
                event_type: TimelineEventKind::Step,
                timestamp: ts,
                name,
                status,
                details: serde_json::json!({
                    "input_summary": input_summary,
                    "output_summary": output_summary,
                    "retries": retries,
                    "latency_ms": latency_ms,
                }),
            });
        }
        drop(stmt);

        let mut stmt = self.conn.prepare(
            "SELECT call_id, step_id, tool_name, status, error_class, error_message, status_code, latency_ms
             FROM tool_calls WHERE run_id = ?1",
        )?;
        let rows = stmt.query_map(params![run_id.as_str()], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, Option<String>>(4)?,
                r.get::<_, Option<String>>(5)?,
                r.get::<_, Option<i64>>(6)?,
                r.get::<_, i64>(7)?,
            ))
        })?;
        for row in rows {
            let (call_id, step_id, tool_name, status, error_class, error_message, status_code, latency_ms) = row?;
            let timestamp = step_started_at.get(&step_id).copied().unwrap_or_else(Timestamp::now);
            events.push(TimelineEvent {
                event_id: call_id,
                event_type: TimelineEventKind::ToolCall,
                timestamp,
                name: tool_name,
                status,
                details: serde_json::json!({
                    "error_class": error_class,
                    "error_message": error_message,
                    "status_code": status_code,
                    "latency_ms": latency_ms,
                }),
            });
        }
        drop(stmt);

        let mut stmt = self
            .conn
            .prepare("SELECT event_id, type, message, created_at FROM guardrail_events WHERE run_id = ?1")?;
        let rows = stmt.query_map(params![run_id.as_str()], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        })?;
        for row in rows {
            let (event_id, kind, message, created_at) = row?;
            events.push(TimelineEvent {
                event_id,
                event_type: TimelineEventKind::Guardrail,
                timestamp: parse_timestamp(&created_at)?,
                name: kind,
                status: "recorded".to_owned(),
                details: serde_json::json!({ "message": message }),
            });
        }

        events.sort_by_key(|e| e.timestamp);
        Ok(Some(events))
    }
}

pub(crate) fn outcome_str(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Success => "success",
        Outcome::Failure => "failure",
    }
}

pub(crate) fn parse_outcome(s: &str) -> Result<Outcome, StoreError> {
    match s {
        "success" => Ok(Outcome::Success),
        "failure" => Ok(Outcome::Failure),
        other => Err(StoreError::Db(format!("invalid outcome in storage: {other}"))),
    }
}

fn environment_str(env: Environment) -> &'static str {
    match env {
        Environment::Prod => "prod",
        Environment::Staging => "staging",
        Environment::Dev => "dev",
    }
}

fn guardrail_kind_str(kind: GuardrailKind) -> &'static str {
    match kind {
        GuardrailKind::PiiRedaction => "pii_redaction",
        GuardrailKind::PolicyBlock => "policy_block",
        GuardrailKind::SchemaValidation => "schema_validation",
        GuardrailKind::Other => "other",
    }
}

pub(crate) fn parse_timestamp(s: &str) -> Result<Timestamp, StoreError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| Timestamp::new(dt.with_timezone(&chrono::Utc)))
        .map_err(|e| StoreError::Db(format!("invalid timestamp in storage: {e}")))
}

#[cfg(test)]
mod tests {
    use agentops_core::identifiers::StepId;
    use agentops_core::model::AgentStep;

    use super::*;
    use crate::Store;

    fn step(name: &str) -> AgentStep {
        AgentStep {
            step_id: StepId::generate(),
            name: name.to_owned(),
            status: Outcome::Success,
            started_at: Timestamp::now(),
            ended_at: Timestamp::now(),
            input_summary: String::new(),
            output_summary: String::new(),
            retries: 0,
            latency_ms: 0,
        }
    }

    fn payload(run_id: &str, steps: Vec<AgentStep>) -> AgentRunPayload {
        AgentRunPayload {
            run_id: Some(run_id.into()),
            agent_name: "a".to_owned(),
            agent_version: "1".to_owned(),
            model: "m".to_owned(),
            environment: Environment::Dev,
            started_at: Timestamp::now(),
            ended_at: Timestamp::now(),
            status: Outcome::Success,
            error_type: None,
            error_message: None,
            trace_id: None,
            correlation_ids: vec![],
            steps,
            tool_calls: vec![],
            guardrail_events: vec![],
            cost: agentops_core::model::CostSummary::default(),
        }
    }

    #[test]
    fn reingest_replaces_children_without_residue() {
        let mut store = Store::open_in_memory().unwrap();
        store.upsert_agent_run(payload("r1", vec![step("a"), step("b"), step("c")])).unwrap();
        store.upsert_agent_run(payload("r1", vec![step("x")])).unwrap();

        let summary = store.get_agent_run_summary(&"r1".into()).unwrap().unwrap();
        assert_eq!(summary.step_count, 1);

        let timeline = store.get_timeline(&"r1".into()).unwrap().unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].name, "x");
    }

    #[test]
    fn reingest_preserves_original_created_at() {
        let mut store = Store::open_in_memory().unwrap();
        store.upsert_agent_run(payload("r1", vec![])).unwrap();
        let first: String = store
            .conn
            .query_row("SELECT created_at FROM agent_runs WHERE run_id = 'r1'", [], |r| r.get(0))
            .unwrap();
        store.upsert_agent_run(payload("r1", vec![])).unwrap();
        let second: String = store
            .conn
            .query_row("SELECT created_at FROM agent_runs WHERE run_id = 'r1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_run_has_no_timeline() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_timeline(&"missing".into()).unwrap().is_none());
    }
}
