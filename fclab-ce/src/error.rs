//! HTTP error mapping for fclab-ce

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fclab_common::Error;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Engine error, mapped per variant
    #[error(transparent)]
    Common(#[from] Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Common(err) => match err {
                Error::ImageNotFound(_) => (StatusCode::NOT_FOUND, "IMAGE_NOT_FOUND"),
                Error::AnnotatorNotFound(_) => (StatusCode::NOT_FOUND, "ANNOTATOR_NOT_FOUND"),
                Error::NoTaskAvailable(_) => (StatusCode::NOT_FOUND, "NO_TASK_AVAILABLE"),
                Error::InsufficientReliability { .. } => {
                    (StatusCode::FORBIDDEN, "INSUFFICIENT_RELIABILITY")
                }
                Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                Error::BlobMissing(_) => (StatusCode::SERVICE_UNAVAILABLE, "BLOB_MISSING"),
                Error::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
                Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
                Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
                Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();
        let message = self.to_string();

        if status.is_server_error() {
            error!(code = error_code, %message, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
