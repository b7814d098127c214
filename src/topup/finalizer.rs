//! Idempotent Finalizer
//!
//! Applies a provider intent to a ledger row. The credit side effect is
//! gated by the ledger's conditional write on PENDING: only the caller whose
//! CAS changed the row performs the balance increment.
//!
//! ```text
//!            confirm_success             mark_failed
//! PENDING ─────────────────▶ SUCCEEDED   PENDING ─────────▶ FAILED
//!                              │                              │
//!                              └── increment(user, coins)     └── (no side effect)
//! ```
//!
//! Ledger and balance store are independent: a crash between the CAS and
//! the increment leaves SUCCEEDED without credit ([`FinalizeError::PartialCredit`]).

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::balance::BalanceStore;
use super::error::FinalizeError;
use super::ledger::TopUpLedger;
use super::state::TopUpStatus;
use super::types::{TopUp, TopUpId, UserId};

/// What a classified notification asks the ledger to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ConfirmSuccess,
    MarkFailed,
}

impl Intent {
    fn target(&self) -> TopUpStatus {
        match self {
            Intent::ConfirmSuccess => TopUpStatus::Succeeded,
            Intent::MarkFailed => TopUpStatus::Failed,
        }
    }
}

/// Result of applying an intent. Every variant is acknowledged to the
/// provider; only `Credited` and `MarkedFailed` changed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Won PENDING → SUCCEEDED and credited the balance
    Credited { user_id: UserId, coins: u64 },
    /// Won PENDING → FAILED
    MarkedFailed,
    /// No ledger entry for this id
    NotFound,
    /// Row was already terminal when read (duplicate or late delivery)
    AlreadyTerminal(TopUpStatus),
    /// Row was PENDING when read but a concurrent writer won the CAS
    LostRace,
}

impl FinalizeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalizeOutcome::Credited { .. } => "CREDITED",
            FinalizeOutcome::MarkedFailed => "MARKED_FAILED",
            FinalizeOutcome::NotFound => "NOT_FOUND",
            FinalizeOutcome::AlreadyTerminal(_) => "ALREADY_TERMINAL",
            FinalizeOutcome::LostRace => "LOST_RACE",
        }
    }

    /// Whether this call changed the ledger
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            FinalizeOutcome::Credited { .. } | FinalizeOutcome::MarkedFailed
        )
    }
}

impl fmt::Display for FinalizeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of the read + CAS step
enum Transition {
    /// This call changed the row; carries the row as read
    Won(TopUp),
    NoOp(FinalizeOutcome),
}

/// Top-up finalizer
pub struct TopUpFinalizer {
    ledger: Arc<dyn TopUpLedger>,
    balances: Arc<dyn BalanceStore>,
}

impl TopUpFinalizer {
    pub fn new(ledger: Arc<dyn TopUpLedger>, balances: Arc<dyn BalanceStore>) -> Self {
        Self { ledger, balances }
    }

    /// Dispatch a classified intent
    pub async fn apply(
        &self,
        intent: Intent,
        topup_id: &TopUpId,
        provider_ref: Option<&str>,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        match intent {
            Intent::ConfirmSuccess => self.confirm_success(topup_id, provider_ref).await,
            Intent::MarkFailed => self.mark_failed(topup_id, provider_ref).await,
        }
    }

    /// Confirm a successful payment and credit the owner exactly once.
    ///
    /// FAILED is sticky: a success arriving after a failure is ignored.
    pub async fn confirm_success(
        &self,
        topup_id: &TopUpId,
        provider_ref: Option<&str>,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        let topup = match self
            .transition(Intent::ConfirmSuccess, topup_id, provider_ref)
            .await?
        {
            Transition::Won(topup) => topup,
            Transition::NoOp(outcome) => return Ok(outcome),
        };

        // Only the CAS winner gets here
        if let Err(e) = self.balances.increment(&topup.user_id, topup.coins).await {
            error!(
                topup_id = %topup_id,
                user_id = %topup.user_id,
                coins = topup.coins,
                code = e.code(),
                error = %e,
                "Top-up marked succeeded but balance increment failed - needs reconciliation"
            );
            return Err(FinalizeError::PartialCredit {
                topup_id: topup_id.clone(),
                user_id: topup.user_id,
                coins: topup.coins,
                reason: e.to_string(),
            });
        }

        info!(
            topup_id = %topup_id,
            user_id = %topup.user_id,
            coins = topup.coins,
            provider_ref = provider_ref.unwrap_or(""),
            "Top-up succeeded, coins credited"
        );

        Ok(FinalizeOutcome::Credited {
            user_id: topup.user_id,
            coins: topup.coins,
        })
    }

    /// Mark a pending top-up failed. Never reverses a success.
    pub async fn mark_failed(
        &self,
        topup_id: &TopUpId,
        provider_ref: Option<&str>,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        match self
            .transition(Intent::MarkFailed, topup_id, provider_ref)
            .await?
        {
            Transition::Won(topup) => {
                info!(
                    topup_id = %topup_id,
                    user_id = %topup.user_id,
                    provider_ref = provider_ref.unwrap_or(""),
                    "Top-up marked failed"
                );
                Ok(FinalizeOutcome::MarkedFailed)
            }
            Transition::NoOp(outcome) => Ok(outcome),
        }
    }

    /// Read the row and, if PENDING, CAS it to the intent's target
    async fn transition(
        &self,
        intent: Intent,
        topup_id: &TopUpId,
        provider_ref: Option<&str>,
    ) -> Result<Transition, FinalizeError> {
        let Some(topup) = self.ledger.get(topup_id).await? else {
            warn!(topup_id = %topup_id, intent = ?intent, "Top-up not found - acknowledging");
            return Ok(Transition::NoOp(FinalizeOutcome::NotFound));
        };

        if topup.status.is_terminal() {
            debug!(
                topup_id = %topup_id,
                status = %topup.status,
                intent = ?intent,
                "Top-up already terminal - duplicate or late notification"
            );
            return Ok(Transition::NoOp(FinalizeOutcome::AlreadyTerminal(
                topup.status,
            )));
        }

        let target = intent.target();
        debug_assert!(topup.status.can_transition_to(target));

        let won = self
            .ledger
            .update_status_if(topup_id, TopUpStatus::Pending, target, provider_ref)
            .await?;

        if !won {
            debug!(
                topup_id = %topup_id,
                intent = ?intent,
                "Conditional write lost to a concurrent notification"
            );
            return Ok(Transition::NoOp(FinalizeOutcome::LostRace));
        }

        Ok(Transition::Won(topup))
    }
}
