//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and the uniform
//! JSON envelope every error response is rendered as.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use debugmate_core::ports::PortError;
use serde::Serialize;
use utoipa::ToSchema;

/// Seconds a client should wait before retrying a retryable failure.
const RETRY_AFTER_SECS: u64 = 5;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No verified identity, or the caller does not own the resource.
    #[error("Unauthorized")]
    Unauthorized,

    /// Malformed, oversized or pattern-rejected input. `field` names the first failure.
    #[error("{message}")]
    Validation { field: String, message: String },

    /// The caller's plan has no sessions left.
    #[error("Session limit reached for your plan. Upgrade to continue debugging.")]
    LimitReached,

    /// The draft expired, was already completed, or never existed.
    #[error("Session expired. Please start a new debug session.")]
    SessionNotFound,

    /// The model timed out, returned unusable output, or exhausted its retries.
    #[error("AI service error. Please try again.")]
    AiUnavailable,

    /// A report was generated but could not be stored. Only ever logged.
    #[error("Debug report could not be persisted: {0}")]
    PersistenceDegraded(String),

    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The machine-readable code clients switch on.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::LimitReached => "LIMIT_REACHED",
            ApiError::SessionNotFound => "SESSION_NOT_FOUND",
            ApiError::AiUnavailable => "AI_UNAVAILABLE",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::LimitReached => StatusCode::FORBIDDEN,
            ApiError::SessionNotFound => StatusCode::NOT_FOUND,
            ApiError::AiUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.status(),
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::INTERNAL_SERVER_ERROR
        )
    }

    /// The human-readable message. Internal details never leave the server.
    fn public_message(&self) -> String {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// The uniform error body returned by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub retryable: bool,
    pub retry_after: Option<u64>,
    /// The first input field that failed validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&ApiError> for ErrorBody {
    fn from(err: &ApiError) -> Self {
        let retryable = err.is_retryable();
        ErrorBody {
            error: err.public_message(),
            code: err.code().to_string(),
            retryable,
            retry_after: retryable.then_some(RETRY_AFTER_SECS),
            field: match err {
                ApiError::Validation { field, .. } => Some(field.clone()),
                _ => None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Validation { field, message } => {
                tracing::debug!("Rejected input on {}: {}", field, message);
            }
            _ if self.status() == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Request failed with internal error: {}", self);
            }
            _ => {}
        }
        (self.status(), Json(ErrorBody::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_errors_are_not_retryable() {
        for err in [
            ApiError::Unauthorized,
            ApiError::validation("code", "Code must be at least 10 characters"),
            ApiError::LimitReached,
            ApiError::SessionNotFound,
        ] {
            let body = ErrorBody::from(&err);
            assert!(!body.retryable);
            assert_eq!(body.retry_after, None);
        }
    }

    #[test]
    fn ai_and_internal_errors_carry_a_retry_hint() {
        let body = ErrorBody::from(&ApiError::AiUnavailable);
        assert_eq!(body.code, "AI_UNAVAILABLE");
        assert!(body.retryable);
        assert_eq!(body.retry_after, Some(RETRY_AFTER_SECS));

        let body = ErrorBody::from(&ApiError::Internal("pool exhausted".to_string()));
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert_eq!(body.error, "Internal server error");
        assert!(body.retryable);
    }

    #[test]
    fn validation_message_is_exposed() {
        let err = ApiError::validation("errorMessage", "Error message too short");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorBody::from(&err).error, "Error message too short");
    }

    #[test]
    fn validation_errors_name_the_failing_field() {
        let err = ApiError::validation("code", "Invalid input detected");
        let json = serde_json::to_value(ErrorBody::from(&err)).unwrap();
        assert_eq!(json["field"], "code");
        assert_eq!(json["error"], "Invalid input detected");

        let json = serde_json::to_value(ErrorBody::from(&ApiError::LimitReached)).unwrap();
        assert!(json.get("field").is_none());
    }

    #[test]
    fn envelope_uses_camel_case_keys() {
        let json = serde_json::to_value(ErrorBody::from(&ApiError::SessionNotFound)).unwrap();
        assert_eq!(json["code"], "SESSION_NOT_FOUND");
        assert!(json["retryAfter"].is_null());
    }
}
