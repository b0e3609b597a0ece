//! Common error types for the media gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Provider rejected the job at submission time. Never retried.
    #[error("{provider} submission failed: {message}")]
    SubmissionFailed { provider: String, message: String },

    /// Provider reported an explicit failure status while polling.
    #[error("{provider} generation failed: {message}")]
    GenerationFailed { provider: String, message: String },

    /// One status query failed. Counted as an elapsed attempt, never surfaced.
    #[error("Transient poll error: {0}")]
    PollTransient(String),

    /// Poll budget exhausted without a terminal state.
    #[error("{provider} generation timed out after {attempts} poll attempts")]
    GenerationTimedOut { provider: String, attempts: u32 },

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Relay failed: {0}")]
    RelayFailed(String),

    #[error("Object storage is not configured")]
    StoreDisabled,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

impl AppError {
    pub fn submission(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SubmissionFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    fn classify(&self) -> (StatusCode, &'static str, Option<&'static str>) {
        match self {
            AppError::Config(_) | AppError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None)
            }
            AppError::Json(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                Some("invalid_json"),
            ),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, "provider_error", None),
            AppError::SubmissionFailed { .. } => (
                StatusCode::BAD_GATEWAY,
                "provider_error",
                Some("submission_failed"),
            ),
            AppError::GenerationFailed { .. } => (
                StatusCode::BAD_GATEWAY,
                "provider_error",
                Some("generation_failed"),
            ),
            AppError::PollTransient(_) => (StatusCode::BAD_GATEWAY, "provider_error", None),
            AppError::GenerationTimedOut { .. } => (
                StatusCode::GATEWAY_TIMEOUT,
                "timeout_error",
                Some("generation_timed_out"),
            ),
            AppError::ProviderNotConfigured(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                Some("provider_not_configured"),
            ),
            AppError::RelayFailed(_) | AppError::Storage(_) => {
                (StatusCode::BAD_GATEWAY, "storage_error", None)
            }
            AppError::StoreDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "storage_error",
                Some("store_disabled"),
            ),
            AppError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error", None)
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = self.classify();

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: error_type.to_string(),
                code: code.map(|c| c.to_string()),
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
