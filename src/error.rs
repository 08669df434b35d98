//! Error types for mtk-host

use crate::services::encoder::EncodeError;
use crate::services::manifest::ManifestError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
///
/// Every error response carries a short machine-readable reason; internal
/// paths and stack traces never reach the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                // Never leak file system detail to the caller
                "internal I/O failure".to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) => ApiError::NotFound(format!("Folder not found: {}", name)),
            StoreError::PathTraversal(path) => {
                ApiError::BadRequest(format!("Invalid path: {}", path))
            }
            StoreError::InvalidName(name) => {
                ApiError::BadRequest(format!("Invalid bundle name: {}", name))
            }
            StoreError::Io(err) => ApiError::Io(err),
        }
    }
}

impl From<EncodeError> for ApiError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::NotFound(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                ApiError::NotFound(format!("Folder not found: {}", name))
            }
            EncodeError::Io(err) => ApiError::Io(err),
            EncodeError::Walk(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ManifestError> for ApiError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::NotFound(name) => {
                ApiError::NotFound(format!("Folder not found: {}", name))
            }
            ManifestError::SceneFolderMissing(name) => {
                ApiError::NotFound(format!("No scene folder in bundle: {}", name))
            }
            ManifestError::Io(err) => ApiError::Io(err),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
