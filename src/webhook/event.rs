//! Stripe event model & classification
//!
//! Only the fields this service correlates on are modeled. Everything else
//! in `data.object` is ignored.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use super::error::ClassifyError;
use crate::topup::{Intent, TopUpId};

/// Metadata key set by the checkout flow on sessions and payment intents
pub const TOPUP_METADATA_KEY: &str = "topup_id";

/// Verified Stripe event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// `checkout.session.*` object
#[derive(Debug, Deserialize)]
struct CheckoutSession {
    #[serde(default)]
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    payment_intent: Option<Expandable>,
}

/// `payment_intent.*` object
#[derive(Debug, Deserialize)]
struct PaymentIntent {
    id: String,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

/// A Stripe reference that is either an id or the expanded object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    fn into_id(self) -> String {
        match self {
            Expandable::Id(id) | Expandable::Object { id } => id,
        }
    }
}

/// Event types this service acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CheckoutCompleted,
    CheckoutExpired,
    PaymentFailed,
}

impl EventKind {
    /// Exact match on the provider's event type
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "checkout.session.completed" => Some(EventKind::CheckoutCompleted),
            "checkout.session.expired" => Some(EventKind::CheckoutExpired),
            "payment_intent.payment_failed" => Some(EventKind::PaymentFailed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CheckoutCompleted => "checkout_completed",
            EventKind::CheckoutExpired => "checkout_expired",
            EventKind::PaymentFailed => "payment_failed",
        }
    }

    pub fn intent(&self) -> Intent {
        match self {
            EventKind::CheckoutCompleted => Intent::ConfirmSuccess,
            EventKind::CheckoutExpired | EventKind::PaymentFailed => Intent::MarkFailed,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An actionable, correlated event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: EventKind,
    pub topup_id: TopUpId,
    /// Payment intent id, best effort
    pub provider_ref: Option<String>,
}

impl Directive {
    pub fn intent(&self) -> Intent {
        self.kind.intent()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Actionable(Directive),
    /// Event type outside the fixed set; acknowledged without action
    Ignored,
}

/// Map a verified event onto a ledger directive
pub fn classify(event: &StripeEvent) -> Result<Classification, ClassifyError> {
    let Some(kind) = EventKind::from_event_type(&event.event_type) else {
        return Ok(Classification::Ignored);
    };

    let (topup_id, provider_ref) = match kind {
        EventKind::CheckoutCompleted | EventKind::CheckoutExpired => {
            let session: CheckoutSession = parse_object(event)?;
            let topup_id = non_empty(session.client_reference_id)
                .or_else(|| metadata_topup_id(session.metadata.as_ref()));
            let provider_ref = non_empty(session.payment_intent.map(Expandable::into_id));
            (topup_id, provider_ref)
        }
        EventKind::PaymentFailed => {
            let intent: PaymentIntent = parse_object(event)?;
            let topup_id = metadata_topup_id(intent.metadata.as_ref());
            (topup_id, non_empty(Some(intent.id)))
        }
    };

    let topup_id = topup_id.ok_or_else(|| ClassifyError::MissingCorrelation {
        event_id: event.id.clone(),
        event_type: event.event_type.clone(),
    })?;

    Ok(Classification::Actionable(Directive {
        kind,
        topup_id: TopUpId::new(topup_id),
        provider_ref,
    }))
}

fn parse_object<T: serde::de::DeserializeOwned>(event: &StripeEvent) -> Result<T, ClassifyError> {
    T::deserialize(&event.data.object).map_err(|e| ClassifyError::MalformedObject {
        event_id: event.id.clone(),
        event_type: event.event_type.clone(),
        reason: e.to_string(),
    })
}

fn metadata_topup_id(metadata: Option<&HashMap<String, String>>) -> Option<String> {
    non_empty(metadata.and_then(|m| m.get(TOPUP_METADATA_KEY).cloned()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, object: serde_json::Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_test",
            "type": event_type,
            "created": 1_700_000_000,
            "data": { "object": object }
        }))
        .unwrap()
    }

    fn directive(c: Classification) -> Directive {
        match c {
            Classification::Actionable(d) => d,
            Classification::Ignored => panic!("expected actionable"),
        }
    }

    #[test]
    fn test_completed_uses_client_reference_id() {
        let e = event(
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "client_reference_id": "T1",
                "metadata": { "topup_id": "T_meta" },
                "payment_intent": "pi_1"
            }),
        );
        let d = directive(classify(&e).unwrap());
        assert_eq!(d.kind, EventKind::CheckoutCompleted);
        assert_eq!(d.intent(), Intent::ConfirmSuccess);
        assert_eq!(d.topup_id, TopUpId::new("T1"));
        assert_eq!(d.provider_ref.as_deref(), Some("pi_1"));
    }

    #[test]
    fn test_completed_falls_back_to_metadata() {
        for client_ref in [json!(null), json!("")] {
            let e = event(
                "checkout.session.completed",
                json!({
                    "client_reference_id": client_ref,
                    "metadata": { "topup_id": "T_meta" }
                }),
            );
            let d = directive(classify(&e).unwrap());
            assert_eq!(d.topup_id, TopUpId::new("T_meta"));
            assert_eq!(d.provider_ref, None);
        }
    }

    #[test]
    fn test_expanded_payment_intent() {
        let e = event(
            "checkout.session.completed",
            json!({
                "client_reference_id": "T1",
                "payment_intent": { "id": "pi_expanded", "object": "payment_intent" }
            }),
        );
        let d = directive(classify(&e).unwrap());
        assert_eq!(d.provider_ref.as_deref(), Some("pi_expanded"));
    }

    #[test]
    fn test_expired_maps_to_mark_failed() {
        let e = event(
            "checkout.session.expired",
            json!({ "client_reference_id": "T2", "payment_intent": null }),
        );
        let d = directive(classify(&e).unwrap());
        assert_eq!(d.kind, EventKind::CheckoutExpired);
        assert_eq!(d.intent(), Intent::MarkFailed);
        assert_eq!(d.topup_id, TopUpId::new("T2"));
    }

    #[test]
    fn test_payment_failed_uses_metadata_and_intent_id() {
        let e = event(
            "payment_intent.payment_failed",
            json!({ "id": "pi_9", "metadata": { "topup_id": "T9" } }),
        );
        let d = directive(classify(&e).unwrap());
        assert_eq!(d.kind, EventKind::PaymentFailed);
        assert_eq!(d.intent(), Intent::MarkFailed);
        assert_eq!(d.topup_id, TopUpId::new("T9"));
        assert_eq!(d.provider_ref.as_deref(), Some("pi_9"));
    }

    #[test]
    fn test_payment_failed_ignores_client_reference_id() {
        // Payment intents carry correlation only in metadata
        let e = event(
            "payment_intent.payment_failed",
            json!({ "id": "pi_9", "client_reference_id": "T9", "metadata": {} }),
        );
        let err = classify(&e).unwrap_err();
        assert_eq!(err.code(), "MISSING_CORRELATION");
    }

    #[test]
    fn test_missing_correlation() {
        let e = event("checkout.session.completed", json!({ "id": "cs_1" }));
        let err = classify(&e).unwrap_err();
        assert!(matches!(err, ClassifyError::MissingCorrelation { ref event_id, .. } if event_id == "evt_test"));
    }

    #[test]
    fn test_unrecognized_types_ignored() {
        for t in [
            "checkout.session.async_payment_succeeded",
            "payment_intent.succeeded",
            "Checkout.Session.Completed",
            "checkout.session.completed ",
        ] {
            let e = event(t, json!({}));
            assert_eq!(classify(&e).unwrap(), Classification::Ignored, "type {:?}", t);
        }
    }

    #[test]
    fn test_malformed_object() {
        let e = event("payment_intent.payment_failed", json!({ "metadata": { "topup_id": "T9" } }));
        let err = classify(&e).unwrap_err();
        assert_eq!(err.code(), "MALFORMED_OBJECT");
    }
}
