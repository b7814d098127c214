//! Balance Store
//!
//! One operation: atomic increment of a user's coin balance. There is no
//! read-modify-write and no decrement path.

use async_trait::async_trait;
use sqlx::PgPool;

use super::error::BalanceError;
use super::types::UserId;

/// Coin balance store
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Add `delta` coins to `user_id`, atomically with respect to every
    /// other increment for the same user. `delta` must be > 0.
    async fn increment(&self, user_id: &UserId, delta: u64) -> Result<(), BalanceError>;
}

/// PostgreSQL-backed balances over `user_coins`
///
/// May live in a different database than the ledger.
pub struct PgBalanceStore {
    pool: PgPool,
}

impl PgBalanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BalanceStore for PgBalanceStore {
    async fn increment(&self, user_id: &UserId, delta: u64) -> Result<(), BalanceError> {
        if delta == 0 {
            return Err(BalanceError::InvalidDelta);
        }
        let delta = i64::try_from(delta).map_err(|_| BalanceError::Overflow)?;

        // Upsert so the first credit creates the balance row
        sqlx::query(
            r#"
            INSERT INTO user_coins (user_id, coins, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET coins = user_coins.coins + EXCLUDED.coins, updated_at = NOW()
            "#,
        )
        .bind(user_id.as_str())
        .bind(delta)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}


#[cfg(test)]
pub use mock::InMemoryBalances;
