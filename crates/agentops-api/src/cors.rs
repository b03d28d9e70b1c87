// crates/agentops-api/src/cors.rs
// ============================================================================
// Module: CORS
// Description: Permissive, origin-checked cross-origin access for the UI.
// Purpose: Mirror the original's `CORSMiddleware` from spec §6.
// Dependencies: axum
// ============================================================================

//! ## Overview
//! No crate in this workspace's dependency stack offers a ready-made CORS
//! layer, so this is a small hand-rolled `axum::middleware::from_fn` —
//! credentials allowed, every method and header allowed, every header
//! exposed (required for `EventSource` to read SSE responses), origin
//! reflected back only when it matches the configured allow-list.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;

#[derive(Clone)]
struct CorsOrigins(Arc<Vec<String>>);

/// Wraps `router` with a CORS layer that allows the configured origins.
/// An empty allow-list (the default) permits no cross-origin requests.
pub fn apply(router: Router, allowed_origins: Vec<String>) -> Router {
    let state = CorsOrigins(Arc::new(allowed_origins));
    router.layer(middleware::from_fn_with_state(state, cors_layer))
}

async fn cors_layer(
    axum::extract::State(state): axum::extract::State<CorsOrigins>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(axum::http::header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_headers(response.headers_mut(), &state, origin.as_deref());
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), &state, origin.as_deref());
    response
}

fn apply_headers(headers: &mut axum::http::HeaderMap, state: &CorsOrigins, origin: Option<&str>) {
    let Some(origin) = origin else {
        return;
    };
    if !state.0.iter().any(|allowed| allowed == origin) {
        return;
    }
    let Ok(value) = HeaderValue::from_str(origin) else {
        return;
    };
    headers.insert(axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    headers.insert(
        axum::http::header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(axum::http::header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("*"));
    headers.insert(axum::http::header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(axum::http::header::ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static("*"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[test]
    fn allowed_origin_is_reflected() {
        let state = CorsOrigins(Arc::new(vec!["https://ui.example".to_owned()]));
        let mut headers = HeaderMap::new();
        apply_headers(&mut headers, &state, Some("https://ui.example"));
        assert_eq!(
            headers.get(axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://ui.example"
        );
        assert_eq!(headers.get(axum::http::header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
    }

    #[test]
    fn unlisted_origin_gets_no_cors_headers() {
        let state = CorsOrigins(Arc::new(vec!["https://ui.example".to_owned()]));
        let mut headers = HeaderMap::new();
        apply_headers(&mut headers, &state, Some("https://evil.example"));
        assert!(headers.get(axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[test]
    fn missing_origin_is_a_no_op() {
        let state = CorsOrigins(Arc::new(vec!["https://ui.example".to_owned()]));
        let mut headers = HeaderMap::new();
        apply_headers(&mut headers, &state, None);
        assert!(headers.is_empty());
    }
}
