// crates/agentops-api/src/lib.rs
// ============================================================================
// Crate: agentops-api
// Description: HTTP surface for ingest, RCA lifecycle, streaming, and metrics.
// Purpose: Implement spec §6's external interface plus the SSE relay (SR).
// Dependencies: agentops-broker, agentops-config, agentops-core,
//               agentops-queue, agentops-store, axum, tokio
// ============================================================================

//! ## Overview
//! [`build_router`] assembles every route in the external interface onto one
//! `axum::Router`, grounded on `decision-gate-mcp::server`'s
//! `tokio::net::TcpListener` + `axum::serve` serving pattern. Every database
//! statement runs inside [`blocking`], a `tokio::task::spawn_blocking`
//! wrapper around the synchronous `agentops-store::Store`, so the async
//! runtime never blocks on SQLite I/O, matching the concurrency model's
//! requirement that DB access be a genuine suspension point.

pub mod agent_runs;
pub mod cors;
pub mod error;
pub mod health;
pub mod metrics;
pub mod rca_runs;
pub mod stream;

use std::sync::{Arc, Mutex, PoisonError};

use agentops_broker::Publisher;
use agentops_config::AppConfig;
use agentops_queue::Enqueue;
use agentops_store::{Store, StoreError};
use axum::routing::{get, post};
use axum::Router;

pub use error::ApiError;

/// Shared, cloneable handle to every resource a handler needs.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<Store>>,
    pub publisher: Arc<Publisher>,
    pub queue: Arc<dyn Enqueue>,
    pub config: Arc<AppConfig>,
}

/// Runs `f` against the store on a blocking thread, translating a panicked
/// task into [`ApiError::Internal`] the same way a 500 would surface from
/// any other unexpected failure.
pub(crate) async fn blocking<T, F>(store: Arc<Mutex<Store>>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut Store) -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = store.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    })
    .await
    .map_err(|_| ApiError::Internal("store task panicked".to_owned()))?
    .map_err(ApiError::from)
}

/// Builds the full router, with CORS applied as the outermost layer so it
/// also governs preflight `OPTIONS` requests and error responses.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let router = Router::new()
        .route("/", get(health::root))
        .route("/agent-runs", post(agent_runs::ingest_agent_run))
        .route("/agent-runs/{run_id}", get(agent_runs::get_agent_run))
        .route("/agent-runs/{run_id}/timeline", get(agent_runs::get_agent_run_timeline))
        .route("/agent-runs/{run_id}/rca-runs", post(rca_runs::create_rca_run))
        .route("/agent-runs/rca-runs/{rca_run_id}", get(rca_runs::get_rca_run))
        .route("/rca-runs/{rca_run_id}/stream", get(stream::rca_stream_handler))
        .route("/metrics/overview", get(metrics::get_metrics_overview))
        .with_state(state);

    cors::apply(router, cors_origins)
}
