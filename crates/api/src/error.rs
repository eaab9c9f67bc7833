//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use note_store::NoteStoreError;
use projections::ShareError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<NoteStoreError> for ApiError {
    fn from(err: NoteStoreError) -> Self {
        match err {
            NoteStoreError::NotFound(id) => ApiError::NotFound(format!("Note {id} not found")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ShareError> for ApiError {
    fn from(err: ShareError) -> Self {
        match err {
            ShareError::NoteNotFound(id) => ApiError::NotFound(format!("Note {id} not found")),
            ShareError::UnknownToken => {
                ApiError::NotFound("Shared note not found or link revoked".to_string())
            }
            ShareError::Store(other) => ApiError::Internal(other.to_string()),
        }
    }
}
