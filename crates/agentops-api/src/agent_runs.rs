// crates/agentops-api/src/agent_runs.rs
// ============================================================================
// Module: Agent Run Handlers
// Description: Ingest and read endpoints for agent telemetry.
// Purpose: Implement `POST/GET /agent-runs*` from spec §6.
// Dependencies: agentops-core, agentops-store, axum
// ============================================================================

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use agentops_core::identifiers::RunId;
use agentops_core::model::AgentRunPayload;

use crate::{blocking, ApiError, AppState};

const INGEST_SECRET_HEADER: &str = "x-ingest-secret";

/// Enforces `app_ingest_secret` when configured; a no-op otherwise, matching
/// the original's opt-in behavior.
fn verify_ingest_secret(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.config.app_ingest_secret.as_deref() else {
        return Ok(());
    };
    let provided = headers.get(INGEST_SECRET_HEADER).and_then(|v| v.to_str().ok());
    if provided == Some(expected) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Invalid or missing ingest secret".to_owned()))
    }
}

/// `POST /agent-runs` — ingest one run's telemetry, full-replace semantics.
pub async fn ingest_agent_run(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AgentRunPayload>,
) -> Result<Json<Value>, ApiError> {
    verify_ingest_secret(&state, &headers)?;
    let run_id = blocking(state.store, move |store| store.upsert_agent_run(payload)).await?;
    Ok(Json(json!({ "run_id": run_id })))
}

/// `GET /agent-runs/{run_id}` — run metadata and child counts.
pub async fn get_agent_run(State(state): State<AppState>, Path(run_id): Path<String>) -> Result<Json<Value>, ApiError> {
    let run_id = RunId::new(run_id);
    let summary = blocking(state.store, move |store| store.get_agent_run_summary(&run_id)).await?;
    let summary = summary.ok_or_else(|| ApiError::NotFound("Agent run not found".to_owned()))?;
    Ok(Json(serde_json::to_value(summary).unwrap_or(Value::Null)))
}

/// `GET /agent-runs/{run_id}/timeline` — merged, timestamp-ordered timeline.
pub async fn get_agent_run_timeline(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let run_id = RunId::new(run_id);
    let timeline = blocking(state.store, move |store| store.get_timeline(&run_id)).await?;
    let timeline = timeline.ok_or_else(|| ApiError::NotFound("Agent run not found".to_owned()))?;
    Ok(Json(serde_json::to_value(timeline).unwrap_or(Value::Null)))
}
