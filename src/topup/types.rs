//! Top-up Core Types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::TopUpStatus;

/// Top-up identifier
///
/// Opaque text assigned by the checkout flow and echoed back by Stripe
/// through `client_reference_id` / `metadata.topup_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopUpId(String);

impl TopUpId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopUpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TopUpId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Owner of a top-up and of a coin balance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A row of the top-up ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopUp {
    pub id: TopUpId,
    pub user_id: UserId,
    /// Coins credited on success, always > 0
    pub coins: u64,
    pub status: TopUpStatus,
    /// Stripe payment intent id, once known
    pub provider_ref: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TopUp {
    /// New pending top-up, as the checkout flow would create it
    pub fn pending(id: impl Into<String>, user_id: impl Into<String>, coins: u64) -> Self {
        Self {
            id: TopUpId::new(id),
            user_id: UserId::new(user_id),
            coins,
            status: TopUpStatus::Pending,
            provider_ref: None,
            updated_at: Utc::now(),
        }
    }
}
