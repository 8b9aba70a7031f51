//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use securedrop_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Optional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// An [`AppError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// HTTP status and machine-readable code for an error kind.
    pub fn status_and_code(kind: &ErrorKind) -> (StatusCode, &'static str) {
        match kind {
            ErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ErrorKind::InvalidToken => (StatusCode::NOT_FOUND, "INVALID_TOKEN"),
            ErrorKind::TokenUnavailable(_) => (StatusCode::FORBIDDEN, "TOKEN_UNAVAILABLE"),
            ErrorKind::PolicyViolation => (StatusCode::FORBIDDEN, "POLICY_VIOLATION"),
            ErrorKind::PathViolation => (StatusCode::BAD_REQUEST, "PATH_VIOLATION"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::RangeNotSatisfiable => {
                (StatusCode::RANGE_NOT_SATISFIABLE, "RANGE_NOT_SATISFIABLE")
            }
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ErrorKind::Internal
            | ErrorKind::Database
            | ErrorKind::Storage
            | ErrorKind::Configuration
            | ErrorKind::Serialization => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, error_code) = Self::status_and_code(&err.kind);

        let (message, details) = match err.kind {
            ErrorKind::TokenUnavailable(reason) => (
                err.message,
                Some(serde_json::json!({ "reason": reason })),
            ),
            kind if kind.is_internal() => {
                tracing::error!(kind = %kind, error = ?err, "Internal server error");
                ("Internal server error".to_string(), None)
            }
            _ => (err.message, None),
        };

        let body = ApiErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}
