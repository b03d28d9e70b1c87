// crates/agentops-api/src/metrics.rs
// ============================================================================
// Module: Metrics Overview
// Description: Aggregate run/latency/cost statistics over a rolling window.
// Purpose: Implement `GET /metrics/overview?hours=` from spec §6.
// Dependencies: agentops-core, agentops-store, axum, serde
// ============================================================================

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use agentops_core::model::MetricsOverview;

use crate::{blocking, ApiError, AppState};

const DEFAULT_HOURS: i64 = 24;
const MIN_HOURS: i64 = 1;
const MAX_HOURS: i64 = 168;

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    hours: Option<i64>,
}

/// `GET /metrics/overview?hours=<1..168>` — defaults to the last 24 hours;
/// an out-of-range value is clamped rather than rejected.
pub async fn get_metrics_overview(
    State(state): State<AppState>,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<MetricsOverview>, ApiError> {
    let hours = query.hours.unwrap_or(DEFAULT_HOURS).clamp(MIN_HOURS, MAX_HOURS);
    let overview = blocking(state.store, move |store| store.get_metrics_overview(hours)).await?;
    Ok(Json(overview))
}
