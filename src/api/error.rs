//! HTTP error mapping.

use crate::orchestration::services::JobServiceError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error answered to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status} [{code}] {message}")]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: &'static str,
}

impl ApiError {
    /// Creates an error with an explicit status and machine-readable code.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
        }
    }

    /// 400 for malformed or incomplete input.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl From<JobServiceError> for ApiError {
    fn from(err: JobServiceError) -> Self {
        let message = err.to_string();
        match err {
            JobServiceError::Domain(_) => {
                Self::new(StatusCode::BAD_REQUEST, message, "VALIDATION_ERROR")
            }
            JobServiceError::InvalidState { .. } => {
                Self::new(StatusCode::BAD_REQUEST, message, "INVALID_STATE")
            }
            JobServiceError::JobNotFound(_) | JobServiceError::TaskNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, message, "NOT_FOUND")
            }
            JobServiceError::PlanningFailed(_) => {
                Self::new(StatusCode::BAD_GATEWAY, message, "PLANNING_FAILED")
            }
            JobServiceError::Store(_) | JobServiceError::Orchestration(_) => {
                error!(error = %message, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "code": self.code,
        }));
        (self.status, body).into_response()
    }
}
