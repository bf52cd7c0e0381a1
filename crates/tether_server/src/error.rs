//! HTTP error mapping for the pairing surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tether_core::CoreError;
use tracing::error;

/// Wrapper turning core errors into `{"error": ...}` JSON responses.
///
/// Bad input and unknown ids are the caller's problem (4xx); everything
/// else from session creation is a 500. Post-connection failures never
/// reach here at all, they only hit the logs.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::InvalidAccount { .. } => StatusCode::BAD_REQUEST,
            CoreError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::Pairing { .. } | CoreError::Staging { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "pairing request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
