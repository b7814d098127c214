//! Coin Top-up Ledger & Finalizer
//!
//! Reconciles provider notifications against the `coin_topups` ledger and
//! credits `user_coins` exactly once per successful payment.
//!
//! # State Machine
//!
//! ```text
//!            ┌──▶ SUCCEEDED  (credit user.coins += topup.coins, once)
//! PENDING ───┤
//!            └──▶ FAILED     (sticky: a later success is ignored)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **CAS on PENDING**: every transition is `UPDATE ... WHERE status = 'pending'`
//! 2. **Winner Credits**: only the caller whose CAS changed the row increments
//! 3. **Terminal Is Final**: SUCCEEDED and FAILED never change again
//! 4. **No 2PC**: ledger and balances are independent stores; a failed
//!    increment after a won CAS is reported as `PartialCredit`, never retried

pub mod balance;
pub mod error;
pub mod finalizer;
pub mod ledger;
pub mod state;
pub mod types;


pub use balance::{BalanceStore, PgBalanceStore};
pub use error::{BalanceError, FinalizeError, LedgerError};
pub use finalizer::{FinalizeOutcome, Intent, TopUpFinalizer};
pub use ledger::{PgTopUpLedger, TopUpLedger};
pub use state::TopUpStatus;
pub use types::{TopUp, TopUpId, UserId};
