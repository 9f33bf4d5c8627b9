//! Common error types for the studio gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::storage::object::ObjectStoreError;
use crate::storage::record::RecordStoreError;

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

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Backend '{0}' is not configured")]
    BackendUnconfigured(String),

    #[error("Generation failed on '{backend}': {message}")]
    GenerationFailed { backend: String, message: String },

    #[error("Request was moderated: {0}")]
    Moderated(String),

    #[error("Timed out: {0}")]
    TimedOut(String),

    #[error("Storage is not available")]
    StorageUnavailable,

    #[error("Record store error: {0}")]
    RecordStore(#[from] RecordStoreError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("User identity required")]
    IdentityRequired,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format returned to API clients
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

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
            AppError::Json(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("invalid_json")),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, "backend_error", None),
            AppError::UnsupportedModel(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", Some("unsupported_model")),
            AppError::BackendUnconfigured(_) => (StatusCode::SERVICE_UNAVAILABLE, "server_error", Some("backend_unconfigured")),
            AppError::GenerationFailed { .. } => (StatusCode::BAD_GATEWAY, "backend_error", Some("generation_failed")),
            AppError::Moderated(_) => (StatusCode::UNPROCESSABLE_ENTITY, "moderation_error", Some("request_moderated")),
            AppError::TimedOut(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout_error", Some("generation_timed_out")),
            AppError::StorageUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "server_error", Some("storage_unavailable")),
            AppError::RecordStore(_) => (StatusCode::BAD_GATEWAY, "storage_error", None),
            AppError::ObjectStore(_) => (StatusCode::BAD_GATEWAY, "storage_error", None),
            AppError::Unauthorized => (StatusCode::FORBIDDEN, "authorization_error", Some("not_owner")),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found_error", None),
            AppError::IdentityRequired => (StatusCode::UNAUTHORIZED, "authentication_error", Some("identity_required")),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        };

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
