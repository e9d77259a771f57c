//! Error types for dvs-verify
//!
//! Every handler failure renders as `{"error": {"code", "message"}}`.

use crate::models::{ValidationError, VerificationReport};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request body could not be read as the expected JSON (400)
    ///
    /// `field` names the offending member when the rejection points at one.
    #[error("Invalid request body: {message}")]
    InvalidBody {
        field: Option<String>,
        message: String,
    },

    /// Claimed identity failed validation (400)
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Reconciliation succeeded but the report was not stored
    ///
    /// The report still travels back to the caller (409 for a duplicate
    /// identifier, 500 otherwise).
    #[error("Report not saved: {error}")]
    NotPersisted {
        error: dvs_common::Error,
        report: Box<VerificationReport>,
    },

    /// dvs-common error
    #[error("Common error: {0}")]
    Common(#[from] dvs_common::Error),
}

impl ApiError {
    pub fn not_persisted(error: dvs_common::Error, report: VerificationReport) -> Self {
        ApiError::NotPersisted {
            error,
            report: Box::new(report),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::InvalidBody { .. } | ApiError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::NotPersisted { error, .. } => match error {
                dvs_common::Error::Conflict(_) => (StatusCode::CONFLICT, "REPORT_NOT_SAVED"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "REPORT_NOT_SAVED"),
            },
            ApiError::Common(err) => match err {
                dvs_common::Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                dvs_common::Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                dvs_common::Error::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let body = match self {
            ApiError::Validation(err) => json!({
                "error": {
                    "code": error_code,
                    "message": err.to_string(),
                    "field": err.field,
                }
            }),
            ApiError::InvalidBody { field, message } => json!({
                "error": {
                    "code": error_code,
                    "message": message,
                    "field": field,
                }
            }),
            ApiError::NotPersisted { error, report } => json!({
                "error": {
                    "code": error_code,
                    "message": format!("Verification completed but the report was not saved: {}", error),
                },
                "report": report,
            }),
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => json!({
                "error": {
                    "code": error_code,
                    "message": msg,
                }
            }),
            ApiError::Common(err) => json!({
                "error": {
                    "code": error_code,
                    "message": err.to_string(),
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
