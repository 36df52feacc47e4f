//! Error types for ldd-hub
//!
//! Validation errors go straight back to the caller; storage errors carry
//! the underlying detail for diagnostics. Empty stores are not an error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Core error taxonomy
#[derive(Debug, Error)]
pub enum HubError {
    /// Missing or rejected credential (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Malformed ingestion body (400)
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Category outside the fixed set (400)
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Persistence layer error (500)
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

/// Convenience Result type using HubError
pub type HubResult<T> = std::result::Result<T, HubError>;

impl From<sqlx::Error> for HubError {
    fn from(err: sqlx::Error) -> Self {
        HubError::StorageFailure(err.to_string())
    }
}

impl HubError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HubError::Unauthorized => StatusCode::UNAUTHORIZED,
            HubError::InvalidPayload(_) | HubError::InvalidCategory(_) => StatusCode::BAD_REQUEST,
            HubError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            HubError::Unauthorized => "UNAUTHORIZED",
            HubError::InvalidPayload(_) => "INVALID_PAYLOAD",
            HubError::InvalidCategory(_) => "INVALID_CATEGORY",
            HubError::StorageFailure(_) => "STORAGE_FAILURE",
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
