use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::models::chat::ErrorBody;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client-caused. The caller's transcript stays as it was.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Deployment is unusable until its environment is fixed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upstream auth error: {0}")]
    UpstreamAuth(String),

    /// The model endpoint answered with a non-success status.
    #[error("Upstream provider error (status {status}): {detail}")]
    Upstream { status: u16, detail: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::TokenExchange(detail) => AppError::UpstreamAuth(detail),
            LlmError::Api { status, message } => AppError::Upstream {
                status,
                detail: message,
            },
            other => AppError::Llm(other.to_string()),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Configuration(_)
            | AppError::UpstreamAuth(_)
            | AppError::Llm(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error, detail) = match self {
            AppError::Validation(msg) => (msg, None),
            AppError::MethodNotAllowed => ("Method not allowed".to_string(), None),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {msg}");
                (msg, None)
            }
            AppError::UpstreamAuth(detail) => {
                tracing::error!("Token exchange failed: {detail}");
                ("Failed to authenticate with Azure".to_string(), None)
            }
            AppError::Upstream { status, detail } => {
                tracing::error!("Azure API error: {status} {detail}");
                ("Failed to get response from Azure".to_string(), Some(detail))
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                ("Failed to process chat message".to_string(), None)
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                ("Failed to process chat message".to_string(), None)
            }
        };

        (status, Json(ErrorBody { error, detail })).into_response()
    }
}
