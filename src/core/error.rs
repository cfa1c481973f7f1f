use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::shared::types::ApiResponse;

/// Message carried by [`AppError::NotConfigured`]; callers match on the
/// variant, the text is what ends up in logs and API responses.
pub const NOT_CONFIGURED_MESSAGE: &str = "Supabase not configured";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Supabase not configured")]
    NotConfigured,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Realtime error: {0}")]
    Realtime(String),
}

impl AppError {
    /// Short text suitable for the wall banner, without the variant prefix
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotConfigured => NOT_CONFIGURED_MESSAGE.to_string(),
            AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::BadRequest(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::Internal(msg)
            | AppError::ExternalServiceError(msg)
            | AppError::Realtime(msg) => msg.clone(),
        }
    }

    pub fn is_not_configured(&self) -> bool {
        matches!(self, AppError::NotConfigured)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::ExternalServiceError(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::NotConfigured => {
                tracing::warn!("Request rejected: backend is not configured");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    NOT_CONFIGURED_MESSAGE.to_string(),
                    None,
                )
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Validation(ref msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                Some(vec![msg.clone()]),
            ),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::PayloadTooLarge(ref msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                msg.clone(),
                Some(vec![msg.clone()]),
            ),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::ExternalServiceError(ref msg) => {
                tracing::error!("External service error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone(), None)
            }
            AppError::Realtime(ref msg) => {
                tracing::error!("Realtime error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone(), None)
            }
        };

        let body = Json(ApiResponse::<()>::error(Some(message), errors));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
