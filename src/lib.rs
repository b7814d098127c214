//! Coin Top-up - Stripe webhook finalizer
//!
//! Verifies Stripe webhook notifications, maps them to a pending coin
//! top-up, and moves it to a terminal status exactly once. Crediting the
//! user's coin balance happens only on the transition into SUCCEEDED.
//!
//! # Modules
//!
//! - [`webhook`] - Signature verification, event classification, HTTP handler
//! - [`topup`] - Ledger store, balance store, finalizer state machine
//! - [`gateway`] - axum router, shared state, health probe, OpenAPI
//! - [`config`] - YAML configuration and environment secrets
//! - [`db`] - PostgreSQL pool
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod topup;
pub mod webhook;

// Convenient re-exports at crate root
pub use config::{AppConfig, ConfigError, Secrets};
pub use topup::{FinalizeError, FinalizeOutcome, TopUpFinalizer, TopUpId, TopUpStatus, UserId};
pub use webhook::{Classification, SignatureVerifier, StripeEvent, WebhookError, classify};
