//! Maps `CoreError` onto the HTTP-visible status codes of §7, never leaking
//! internal error text to untrusted callers — only the categorized kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::CoreError;

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CoreError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CoreError::AlreadyBusy => (StatusCode::CONFLICT, "already busy".to_string()),
            CoreError::DuplicateArtifact => {
                (StatusCode::OK, "duplicate artifact".to_string())
            }
            CoreError::Transient(_)
            | CoreError::DataFormat(_)
            | CoreError::FileCorruption(_)
            | CoreError::FileMissing(_)
            | CoreError::Unknown(_) => {
                tracing::error!(error = %self, "internal failure surfaced at external interface");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
