//! Stripe webhook endpoint
//!
//! Acknowledgment contract:
//! - non-POST → 405 `{"error":"METHOD_NOT_ALLOWED"}`
//! - bad signature or unreadable/oversized body → 400 `{"error":"BAD_SIGNATURE"}`,
//!   nothing read or written
//! - processed or no-op → 200 `{"ok":true,"handled":true}`
//! - internal failure → 200 `{"ok":true,"handled":false}` so Stripe does not
//!   start a retry storm; the detail goes to the error log

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};
use utoipa::ToSchema;

use super::error::{WebhookError, WebhookRejection};
use super::event::{Classification, StripeEvent, classify};
use super::signature::SIGNATURE_HEADER;
use crate::gateway::state::AppState;
use crate::topup::TopUpFinalizer;

/// Acknowledgment body
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct WebhookAck {
    #[schema(example = true)]
    pub ok: bool,
    /// false when processing failed internally and needs operator attention
    #[schema(example = true)]
    pub handled: bool,
}

impl WebhookAck {
    pub fn handled() -> Self {
        Self {
            ok: true,
            handled: true,
        }
    }

    pub fn unhandled() -> Self {
        Self {
            ok: true,
            handled: false,
        }
    }
}

/// Stripe webhook
///
/// Verifies the `Stripe-Signature` over the raw body, then finalizes the
/// referenced coin top-up. The documented path is the default
/// `gateway.webhook_path`; the router mounts whatever is configured.
#[utoipa::path(
    post,
    path = "/webhooks/stripe",
    params(
        ("Stripe-Signature" = String, Header, description = "t=<unix seconds>,v1=<hex HMAC-SHA256>")
    ),
    request_body(content = String, description = "Raw Stripe event JSON", content_type = "application/json"),
    responses(
        (status = 200, description = "Acknowledged (handled=false on internal failure)", body = WebhookAck),
        (status = 400, description = "Invalid signature", body = WebhookRejection),
        (status = 405, description = "Method not allowed", body = WebhookRejection)
    ),
    tag = "Webhook"
)]
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if method != Method::POST {
        return WebhookError::MethodNotAllowed.into_response();
    }

    // Oversized or unreadable bodies cannot be verified
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(reason = %rejection, "Webhook body unreadable");
            let e = WebhookError::InvalidSignature;
            warn!(code = e.code(), "Rejected webhook");
            return e.into_response();
        }
    };

    // Raw bytes in, nothing parsed before the MAC check
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let event = match state.verifier.verify(&body, signature) {
        Ok(event) => event,
        Err(e) => {
            warn!(code = e.code(), body_len = body.len(), "Rejected webhook");
            return e.into_response();
        }
    };

    let span = info_span!(
        "stripe_event",
        event_id = %event.id,
        event_type = %event.event_type,
        livemode = event.livemode
    );
    let handled = dispatch_event(&state.finalizer, &event)
        .instrument(span)
        .await;

    let ack = if handled {
        WebhookAck::handled()
    } else {
        WebhookAck::unhandled()
    };
    (StatusCode::OK, Json(ack)).into_response()
}

/// Classify a verified event and apply it to the ledger.
///
/// Returns false only for internal failures; every no-op is "handled".
pub async fn dispatch_event(finalizer: &TopUpFinalizer, event: &StripeEvent) -> bool {
    let directive = match classify(event) {
        Ok(Classification::Actionable(directive)) => directive,
        Ok(Classification::Ignored) => {
            info!("Ignoring unhandled event type");
            return true;
        }
        Err(e) => {
            warn!(code = e.code(), error = %e, "Unprocessable event - acknowledging");
            return true;
        }
    };

    match finalizer
        .apply(
            directive.intent(),
            &directive.topup_id,
            directive.provider_ref.as_deref(),
        )
        .await
    {
        Ok(outcome) => {
            info!(
                topup_id = %directive.topup_id,
                kind = %directive.kind,
                outcome = %outcome,
                "Event processed"
            );
            true
        }
        Err(e) => {
            error!(
                topup_id = %directive.topup_id,
                kind = %directive.kind,
                code = e.code(),
                error = %e,
                "Event processing failed"
            );
            false
        }
    }
}
