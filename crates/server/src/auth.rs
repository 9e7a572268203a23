//! Request authentication (§4.12).
//!
//! Per §4.6/§4.12: every route but the health/status probes requires a
//! bearer token or API key matched against the configured key set.
//! Grounded on `gate`'s `auth_middleware`, generalized from "any non-empty
//! token" to an actual allow-list check.

use axum::{extract::State, http::StatusCode};
use std::sync::Arc;

use crate::state::AppState;

const PUBLIC_PATHS: &[&str] = &["/health", "/status/liveness", "/status/readiness"];

pub async fn auth_middleware(State(state): State<Arc<AppState>>, req: axum::extract::Request, next: axum::middleware::Next) -> Result<axum::response::Response, StatusCode> {
    if PUBLIC_PATHS.contains(&req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let header = req.headers().get("authorization").and_then(|h| h.to_str().ok());
    let token = match header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        Some(h) if h.starts_with("ApiKey ") => &h[7..],
        _ => {
            tracing::warn!(path = %req.uri().path(), "unauthorized: missing or malformed credentials");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    if token.is_empty() || !state.api_keys.iter().any(|k| k == token) {
        tracing::warn!(path = %req.uri().path(), "unauthorized: credential not recognized");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}
