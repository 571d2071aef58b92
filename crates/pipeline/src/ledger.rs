//! Credit ledger: atomic reservation and refund of generation credits.

use std::sync::Arc;

use async_trait::async_trait;
use pixora_core::credits::{CreditBalance, CreditSpend};
use pixora_core::types::UserId;
use pixora_db::repositories::CreditRepo;
use pixora_db::DbPool;
use pixora_events::{DomainEvent, EventBus};

use crate::balance_cache::BalanceCache;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The balance does not cover the cost. Nothing was deducted.
    #[error("Insufficient credits: {required} required, {available} available")]
    Insufficient { required: i32, available: i32 },

    #[error("{0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// A successful reservation: the balance left and what was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reserved {
    pub balance: CreditBalance,
    pub spend: CreditSpend,
}

/// Source of truth for spendable credits.
///
/// `reserve` must be atomic with respect to concurrent reservations for the
/// same user: two requests that each fit the balance alone but not together
/// must not both succeed.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Deduct `cost` (base first, then bonus).
    async fn reserve(&self, user_id: UserId, cost: i32) -> Result<Reserved, LedgerError>;

    /// Give back a reservation to the pools it was taken from.
    async fn refund(
        &self,
        user_id: UserId,
        spend: CreditSpend,
    ) -> Result<CreditBalance, LedgerError>;
}

/// Postgres-backed ledger. Publishes `credits.changed` after every mutation.
pub struct PgCreditLedger {
    pool: DbPool,
    cache: Arc<BalanceCache>,
    events: Arc<EventBus>,
}

impl PgCreditLedger {
    pub fn new(pool: DbPool, cache: Arc<BalanceCache>, events: Arc<EventBus>) -> Self {
        Self {
            pool,
            cache,
            events,
        }
    }

    /// Add credits to both pools, creating the account on first use.
    pub async fn grant(
        &self,
        user_id: UserId,
        base: i32,
        bonus: i32,
    ) -> Result<CreditBalance, sqlx::Error> {
        let balance = CreditRepo::grant(&self.pool, user_id, base, bonus)
            .await?
            .balance();
        tracing::info!(user_id = %user_id, base, bonus, total = balance.total(), "Credits granted");
        self.balance_changed(user_id, balance).await;
        Ok(balance)
    }

    async fn balance_changed(&self, user_id: UserId, balance: CreditBalance) {
        self.cache.invalidate(user_id).await;
        self.events.publish(DomainEvent::credits_changed(
            user_id,
            balance.base,
            balance.bonus,
        ));
    }
}

#[async_trait]
impl CreditLedger for PgCreditLedger {
    async fn reserve(&self, user_id: UserId, cost: i32) -> Result<Reserved, LedgerError> {
        match CreditRepo::reserve(&self.pool, user_id, cost).await? {
            Some(reservation) => {
                let balance = reservation.account.balance();
                let spend = reservation.spend();
                tracing::info!(
                    user_id = %user_id,
                    cost,
                    base_spent = spend.base,
                    bonus_spent = spend.bonus,
                    base = balance.base,
                    bonus = balance.bonus,
                    "Credits reserved",
                );
                self.balance_changed(user_id, balance).await;
                Ok(Reserved { balance, spend })
            }
            None => {
                // Read back only to report the shortfall.
                let available = CreditRepo::find(&self.pool, user_id)
                    .await?
                    .map(|account| account.balance().total())
                    .unwrap_or(0);
                Err(LedgerError::Insufficient {
                    required: cost,
                    available,
                })
            }
        }
    }

    async fn refund(
        &self,
        user_id: UserId,
        spend: CreditSpend,
    ) -> Result<CreditBalance, LedgerError> {
        let account = CreditRepo::refund(&self.pool, user_id, spend)
            .await?
            .ok_or_else(|| {
                LedgerError::Unavailable(format!("No credit account for user {user_id}"))
            })?;
        let balance = account.balance();
        tracing::info!(
            user_id = %user_id,
            base_refunded = spend.base,
            bonus_refunded = spend.bonus,
            base = balance.base,
            bonus = balance.bonus,
            "Credits refunded",
        );
        self.balance_changed(user_id, balance).await;
        Ok(balance)
    }
}
