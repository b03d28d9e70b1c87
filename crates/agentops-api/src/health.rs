// crates/agentops-api/src/health.rs
// ============================================================================
// Module: Health Check
// Description: Bare liveness endpoint.
// Purpose: Mirror the original service's `GET /` response exactly.
// Dependencies: axum
// ============================================================================

use axum::Json;
use serde_json::{json, Value};

/// `GET /` — liveness check, no dependency on the store or queue.
pub async fn root() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "agentops-smart-sre" }))
}
