// crates/agentops-api/src/error.rs
// ============================================================================
// Module: API Error Mapping
// Description: Translates domain failures into HTTP responses.
// Purpose: One place mapping every handler's `Err` to a status + body.
// Dependencies: axum, agentops-store
// ============================================================================

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use agentops_queue::QueueError;
use agentops_store::StoreError;

/// Error surface for every `agentops-api` handler. Maps to the status codes
/// the original FastAPI `HTTPException` call sites use, so a client
/// observes the same contract.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RunNotFound(id) => Self::NotFound(format!("Agent run not found: {id}")),
            StoreError::RcaRunNotFound(id) => Self::NotFound(format!("RCA run not found: {id}")),
            StoreError::Db(msg) => Self::Internal(msg),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        Self::Internal(err.to_string())
    }
}
