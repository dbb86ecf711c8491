use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::github_client::StoreError;
use crate::llm_client::LlmError;

/// Upstream error bodies are cut to this many characters before they reach a client.
pub const UPSTREAM_MESSAGE_LIMIT: usize = 500;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request")]
    BadRequest,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Version conflict (status {status}): {message}")]
    Conflict { status: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingApiKey => AppError::Config(e.to_string()),
            other => AppError::Llm(truncate_upstream(&other.to_string())),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::MissingToken => AppError::Config(e.to_string()),
            StoreError::Conflict { status, message } => AppError::Conflict { status, message },
            StoreError::Api { status, message } => AppError::Upstream { status, message },
            other => AppError::Storage(truncate_upstream(&other.to_string())),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Upstream { status, message } => {
                tracing::error!("Upstream error {status}: {message}");
                (passthrough_status(*status), message.clone())
            }
            AppError::Conflict { status, message } => {
                tracing::warn!("Version conflict {status}: {message}");
                let body = Json(json!({
                    "error": message,
                    "conflict": true
                }));
                return (passthrough_status(*status), body).into_response();
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Reuses an upstream failure status; anything that is not a 4xx/5xx becomes 500.
fn passthrough_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Cuts an upstream message to `UPSTREAM_MESSAGE_LIMIT` characters.
pub fn truncate_upstream(message: &str) -> String {
    let message = message.trim();
    match message.char_indices().nth(UPSTREAM_MESSAGE_LIMIT) {
        Some((idx, _)) => format!("{}…", &message[..idx]),
        None => message.to_string(),
    }
}
