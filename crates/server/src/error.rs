//! Maps `ControlPlaneError` to the stable HTTP error envelope (§7).

use agentkern_common::ControlPlaneError;
use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    retryable: bool,
}

pub struct ApiError(pub ControlPlaneError);

impl From<ControlPlaneError> for ApiError {
    fn from(e: ControlPlaneError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // 5xx bodies are redacted: never echo internal error text to the wire.
        let message = if status.is_server_error() { "an internal error occurred".to_string() } else { self.0.to_string() };
        let body = ErrorBody { error: self.0.code(), message, retryable: self.0.is_retryable() };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
