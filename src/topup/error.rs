//! Top-up Error Types
//!
//! No-op outcomes (unknown id, already terminal) are not errors; see
//! [`FinalizeOutcome`](super::finalizer::FinalizeOutcome).

use thiserror::Error;

use super::types::{TopUpId, UserId};

/// Ledger store errors
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Corrupt ledger row {id}: {reason}")]
    CorruptRow { id: String, reason: String },
}

impl LedgerError {
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::DatabaseError(_) => "DATABASE_ERROR",
            LedgerError::CorruptRow { .. } => "CORRUPT_ROW",
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// Balance store errors
#[derive(Error, Debug, Clone)]
pub enum BalanceError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Increment must be greater than zero")]
    InvalidDelta,

    #[error("Increment would overflow the balance")]
    Overflow,
}

impl BalanceError {
    pub fn code(&self) -> &'static str {
        match self {
            BalanceError::DatabaseError(_) => "DATABASE_ERROR",
            BalanceError::InvalidDelta => "INVALID_DELTA",
            BalanceError::Overflow => "OVERFLOW",
        }
    }
}

impl From<sqlx::Error> for BalanceError {
    fn from(e: sqlx::Error) -> Self {
        BalanceError::DatabaseError(e.to_string())
    }
}

/// Finalizer errors
///
/// Both variants are internal failures: the webhook acknowledges them with
/// `handled:false` and routes the detail to logs.
#[derive(Error, Debug, Clone)]
pub enum FinalizeError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Ledger says SUCCEEDED but the increment failed or never ran.
    /// Not retried here; needs out-of-band reconciliation.
    #[error(
        "Partial credit: top-up {topup_id} is succeeded but {coins} coins were not credited to user {user_id}: {reason}"
    )]
    PartialCredit {
        topup_id: TopUpId,
        user_id: UserId,
        coins: u64,
        reason: String,
    },
}

impl FinalizeError {
    pub fn code(&self) -> &'static str {
        match self {
            FinalizeError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            FinalizeError::PartialCredit { .. } => "PARTIAL_CREDIT",
        }
    }
}

impl From<LedgerError> for FinalizeError {
    fn from(e: LedgerError) -> Self {
        FinalizeError::StoreUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::DatabaseError("x".into()).code(),
            "DATABASE_ERROR"
        );
        assert_eq!(BalanceError::InvalidDelta.code(), "INVALID_DELTA");
        assert_eq!(
            FinalizeError::StoreUnavailable("down".into()).code(),
            "STORE_UNAVAILABLE"
        );
    }

    #[test]
    fn test_ledger_error_becomes_store_unavailable() {
        let err: FinalizeError = LedgerError::DatabaseError("pool timed out".into()).into();
        assert!(matches!(err, FinalizeError::StoreUnavailable(ref m) if m.contains("pool timed out")));
    }

    #[test]
    fn test_partial_credit_display() {
        let err = FinalizeError::PartialCredit {
            topup_id: TopUpId::new("T1"),
            user_id: UserId::new("U1"),
            coins: 100,
            reason: "connection reset".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("T1"));
        assert!(msg.contains("U1"));
        assert!(msg.contains("100"));
        assert_eq!(err.code(), "PARTIAL_CREDIT");
    }
}
