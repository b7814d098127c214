//! Stripe Webhook Boundary
//!
//! ```text
//! POST /webhooks/stripe
//!   │
//!   ├─ signature::SignatureVerifier   raw body + Stripe-Signature → StripeEvent | 400
//!   ├─ event::classify                StripeEvent → Directive | Ignored | MissingCorrelation
//!   └─ topup::TopUpFinalizer          Directive → ledger CAS (+ credit) → 200 handled
//! ```

pub mod error;
pub mod event;
pub mod handler;
pub mod signature;


pub use error::{ClassifyError, WebhookError};
pub use event::{Classification, Directive, EventKind, StripeEvent, classify};
pub use handler::{WebhookAck, dispatch_event, stripe_webhook};
pub use signature::{SignatureVerifier, compute_signature, signature_header};
