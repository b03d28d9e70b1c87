// crates/agentops-store/src/evidence.rs
// ============================================================================
// Module: Evidence Store Read Path
// Description: Pure reads of a run's telemetry bundle, no caching.
// Purpose: Implement the ES component described by the orchestrator's stage 2.
// Dependencies: rusqlite
// ============================================================================

use agentops_core::identifiers::RunId;
use agentops_core::model::{
    AgentRun, AgentStep, CostSummary, EvidenceBundle, GuardrailEvent, GuardrailKind, ToolCall,
};
use rusqlite::{params, OptionalExtension};

use crate::ingest::{parse_outcome, parse_timestamp};
use crate::{Store, StoreError};

impl Store {
    /// Loads the full evidence bundle for a run: the run row, its steps
    /// ordered by `started_at`, its tool calls (unordered), and its
    /// guardrail events ordered by `created_at`. Returns `None` if the run
    /// does not exist.
    ///
    /// # Errors
    /// Returns [`StoreError`] on a database failure.
    pub fn load_bundle(&self, run_id: &RunId) -> Result<Option<EvidenceBundle>, StoreError> {
        let Some(run) = self.load_run(run_id)? else {
            return Ok(None);
        };
        let steps = self.load_steps(run_id)?;
        let tool_calls = self.load_tool_calls(run_id)?;
        let guardrails = self.load_guardrails(run_id)?;
        Ok(Some(EvidenceBundle {
            run,
            steps,
            tool_calls,
            guardrails,
        }))
    }

    fn load_run(&self, run_id: &RunId) -> Result<Option<AgentRun>, StoreError> {
        self.conn
            .query_row(
                "SELECT agent_name, agent_version, model, environment, started_at, ended_at, status,
                        error_type, error_message, trace_id, correlation_ids, cost_json, created_at
                 FROM agent_runs WHERE run_id = ?1",
                params![run_id.as_str()],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, String>(4)?,
                        r.get::<_, String>(5)?,
                        r.get::<_, String>(6)?,
                        r.get::<_, Option<String>>(7)?,
                        r.get::<_, Option<String>>(8)?,
                        r.get::<_, Option<String>>(9)?,
                        r.get::<_, String>(10)?,
                        r.get::<_, String>(11)?,
                        r.get::<_, String>(12)?,
                    ))
                },
            )
            .optional()?
            .map(|row| {
                let (
                    agent_name,
                    agent_version,
                    model,
                    environment,
                    started_at,
                    ended_at,
                    status,
                    error_type,
                    error_message,
                    trace_id,
                    correlation_ids,
                    cost_json,
                    created_at,
                ) = row;
                Ok(AgentRun {
                    run_id: run_id.clone(),
                    agent_name,
                    agent_version,
                    model,
                    environment: parse_environment(&environment)?,
                    started_at: parse_timestamp(&started_at)?,
                    ended_at: parse_timestamp(&ended_at)?,
                    status: parse_outcome(&status)?,
                    error_type,
                    error_message,
                    trace_id,
                    correlation_ids: serde_json::from_str(&correlation_ids).unwrap_or_default(),
                    cost: serde_json::from_str::<CostSummary>(&cost_json).unwrap_or_default(),
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .transpose()
    }

    fn load_steps(&self, run_id: &RunId) -> Result<Vec<AgentStep>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT step_id, name, status, started_at, ended_at, input_summary, output_summary, retries, latency_ms
             FROM agent_steps WHERE run_id = ?1 ORDER BY started_at ASC",
        )?;
        let rows = stmt.query_map(params![run_id.as_str()], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, String>(5)?,
                r.get::<_, String>(6)?,
                r.get::<_, i64>(7)?,
                r.get::<_, i64>(8)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (step_id, name, status, started_at, ended_at, input_summary, output_summary, retries, latency_ms) =
                row?;
            out.push(AgentStep {
                step_id: step_id.into(),
                name,
                status: parse_outcome(&status)?,
                started_at: parse_timestamp(&started_at)?,
                ended_at: parse_timestamp(&ended_at)?,
                input_summary,
                output_summary,
                retries,
                latency_ms,
            });
        }
        Ok(out)
    }

    fn load_tool_calls(&self, run_id: &RunId) -> Result<Vec<ToolCall>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT call_id, step_id, tool_name, status, args_json, args_hash, result_summary,
                    error_class, error_message, status_code, retries, latency_ms
             FROM tool_calls WHERE run_id = ?1",
        )?;
        let rows = stmt.query_map(params![run_id.as_str()], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, String>(5)?,
                r.get::<_, String>(6)?,
                r.get::<_, Option<String>>(7)?,
                r.get::<_, Option<String>>(8)?,
                r.get::<_, Option<i64>>(9)?,
                r.get::<_, i64>(10)?,
                r.get::<_, i64>(11)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (
                call_id,
                step_id,
                tool_name,
                status,
                args_json,
                args_hash,
                result_summary,
                error_class,
                error_message,
                status_code,
                retries,
                latency_ms,
            ) = row?;
            out.push(ToolCall {
                call_id: call_id.into(),
                step_id: step_id.into(),
                tool_name,
                status: parse_outcome(&status)?,
                args_json: serde_json::from_str(&args_json).unwrap_or(serde_json::Value::Null),
                args_hash,
                result_summary,
                error_class,
                error_message,
                status_code,
                retries,
                latency_ms,
            });
        }
        Ok(out)
    }

    fn load_guardrails(&self, run_id: &RunId) -> Result<Vec<GuardrailEvent>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, type, message, step_id, call_id, created_at
             FROM guardrail_events WHERE run_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![run_id.as_str()], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, Option<String>>(4)?,
                r.get::<_, String>(5)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (event_id, kind, message, step_id, call_id, created_at) = row?;
            out.push(GuardrailEvent {
                event_id: event_id.into(),
                kind: parse_guardrail_kind(&kind)?,
                message,
                step_id: step_id.map(Into::into),
                call_id: call_id.map(Into::into),
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(out)
    }
}

fn parse_environment(s: &str) -> Result<agentops_core::model::Environment, StoreError> {
    use agentops_core::model::Environment;
    match s {
        "prod" => Ok(Environment::Prod),
        "staging" => Ok(Environment::Staging),
        "dev" => Ok(Environment::Dev),
        other => Err(StoreError::Db(format!("invalid environment in storage: {other}"))),
    }
}

fn parse_guardrail_kind(s: &str) -> Result<GuardrailKind, StoreError> {
    match s {
        "pii_redaction" => Ok(GuardrailKind::PiiRedaction),
        "policy_block" => Ok(GuardrailKind::PolicyBlock),
        "schema_validation" => Ok(GuardrailKind::SchemaValidation),
        "other" => Ok(GuardrailKind::Other),
        other => Err(StoreError::Db(format!("invalid guardrail type in storage: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use agentops_core::model::{AgentRunPayload, CostSummary, Environment, Outcome};
    use agentops_core::Timestamp;

    use super::*;

    fn payload(run_id: &str) -> AgentRunPayload {
        AgentRunPayload {
            run_id: Some(run_id.into()),
            agent_name: "test-agent".to_owned(),
            agent_version: "1.0".to_owned(),
            model: "gpt-test".to_owned(),
            environment: Environment::Dev,
            started_at: Timestamp::now(),
            ended_at: Timestamp::now(),
            status: Outcome::Failure,
            error_type: None,
            error_message: None,
            trace_id: None,
            correlation_ids: vec![],
            steps: vec![],
            tool_calls: vec![],
            guardrail_events: vec![],
            cost: CostSummary::default(),
        }
    }

    #[test]
    fn load_bundle_returns_none_for_unknown_run() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.load_bundle(&RunId::new("nope")).unwrap().is_none());
    }

    #[test]
    fn load_bundle_round_trips_empty_children() {
        let mut store = Store::open_in_memory().unwrap();
        store.upsert_agent_run(payload("r1")).unwrap();
        let bundle = store.load_bundle(&RunId::new("r1")).unwrap().unwrap();
        assert!(bundle.steps.is_empty());
        assert!(bundle.tool_calls.is_empty());
        assert!(bundle.guardrails.is_empty());
    }
}
