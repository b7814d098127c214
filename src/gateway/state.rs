use std::sync::Arc;

use crate::db::Database;
use crate::topup::TopUpFinalizer;
use crate::webhook::SignatureVerifier;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    /// Webhook signature verifier (holds the signing secret)
    pub verifier: Arc<SignatureVerifier>,
    /// Top-up finalizer over the ledger and balance stores
    pub finalizer: Arc<TopUpFinalizer>,
    /// Ledger database, pinged by the health check
    pub pg_db: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(
        verifier: Arc<SignatureVerifier>,
        finalizer: Arc<TopUpFinalizer>,
        pg_db: Option<Arc<Database>>,
    ) -> Self {
        Self {
            verifier,
            finalizer,
            pg_db,
        }
    }
}
