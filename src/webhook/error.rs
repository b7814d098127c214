//! Webhook boundary errors
//!
//! Only boundary rejections live here. Everything after verification is
//! acknowledged with 200 and reported through logs.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Rejections returned to the provider
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookError {
    /// Missing/malformed header, stale timestamp, MAC mismatch or
    /// unreadable body. Deliberately does not say which.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl WebhookError {
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::InvalidSignature => "BAD_SIGNATURE",
            WebhookError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature => StatusCode::BAD_REQUEST,
            WebhookError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

/// Rejection body: `{"error": "BAD_SIGNATURE"}`
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookRejection {
    #[schema(example = "BAD_SIGNATURE")]
    pub error: String,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (
            self.http_status(),
            Json(WebhookRejection {
                error: self.code().to_string(),
            }),
        )
            .into_response()
    }
}

/// Verified event that cannot be mapped to a ledger action.
/// Acknowledged as a no-op so the provider stops redelivering it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("No top-up correlation id on {event_type} event {event_id}")]
    MissingCorrelation { event_id: String, event_type: String },

    #[error("Malformed {event_type} object on event {event_id}: {reason}")]
    MalformedObject {
        event_id: String,
        event_type: String,
        reason: String,
    },
}

impl ClassifyError {
    pub fn code(&self) -> &'static str {
        match self {
            ClassifyError::MissingCorrelation { .. } => "MISSING_CORRELATION",
            ClassifyError::MalformedObject { .. } => "MALFORMED_OBJECT",
        }
    }
}
