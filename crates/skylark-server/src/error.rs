use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use skylark_billing::PaymentError;
use skylark_core::checkout::ValidationError;

/// Application-level errors that map directly to HTTP responses.
///
/// Every variant implements [`IntoResponse`] so Axum handlers can use
/// `Result<impl IntoResponse, AppError>` as their return type. Provider
/// failures are logged in full here and surfaced to the caller as a
/// generic message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("invalid request body")]
    InvalidBody,

    #[error("rate limited")]
    RateLimited { retry_after_seconds: u64 },

    #[error("payments not configured")]
    NotConfigured,

    #[error("payment provider failure")]
    Provider(#[from] PaymentError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, retry_after_seconds) = match &self {
            AppError::Validation(e) => {
                tracing::debug!(code = e.code(), "checkout request rejected: {e}");
                (StatusCode::BAD_REQUEST, e.to_string(), None)
            }
            AppError::InvalidBody => (
                StatusCode::BAD_REQUEST,
                "Invalid request body".to_string(),
                None,
            ),
            AppError::RateLimited {
                retry_after_seconds,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again shortly".to_string(),
                Some(*retry_after_seconds),
            ),
            AppError::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Checkout is not configured".to_string(),
                None,
            ),
            AppError::Provider(e) => {
                tracing::error!(error = %e, "payment provider call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unable to create checkout session".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();

        if let Some(retry_after_seconds) = retry_after_seconds {
            if let Ok(value) = retry_after_seconds.to_string().parse() {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
        }

        response
    }
}
