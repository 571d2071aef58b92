//! Short-lived cache of credit balances for the balance read endpoint.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use pixora_core::credits::CreditBalance;
use pixora_core::types::UserId;
use tokio::sync::RwLock;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

#[derive(Default)]
struct Slot {
    /// Bumped by every invalidation.
    epoch: u64,
    cached: Option<(CreditBalance, Instant)>,
}

/// Per-user balance cache with a fixed TTL.
///
/// Any writer that mutates a balance must call [`BalanceCache::invalidate`];
/// the TTL only bounds staleness from writers outside this process.
///
/// Readers that fill the cache from the database take an [`epoch`] before
/// the query and store the result with [`put_if_unchanged`], so a balance
/// read before a concurrent mutation is never cached after its invalidation.
///
/// [`epoch`]: BalanceCache::epoch
/// [`put_if_unchanged`]: BalanceCache::put_if_unchanged
pub struct BalanceCache {
    ttl: Duration,
    slots: RwLock<HashMap<UserId, Slot>>,
}

impl BalanceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, user_id: UserId) -> Option<CreditBalance> {
        let slots = self.slots.read().await;
        slots
            .get(&user_id)
            .and_then(|slot| slot.cached)
            .filter(|(_, stored_at)| stored_at.elapsed() < self.ttl)
            .map(|(balance, _)| balance)
    }

    /// Current invalidation epoch for `user_id`.
    pub async fn epoch(&self, user_id: UserId) -> u64 {
        self.slots
            .read()
            .await
            .get(&user_id)
            .map_or(0, |slot| slot.epoch)
    }

    /// Store `balance` unless the user was invalidated since `epoch` was
    /// taken. Returns whether the entry was stored.
    pub async fn put_if_unchanged(
        &self,
        user_id: UserId,
        epoch: u64,
        balance: CreditBalance,
    ) -> bool {
        let mut slots = self.slots.write().await;
        let slot = slots.entry(user_id).or_default();
        if slot.epoch != epoch {
            return false;
        }
        slot.cached = Some((balance, Instant::now()));
        true
    }

    pub async fn invalidate(&self, user_id: UserId) {
        let mut slots = self.slots.write().await;
        let slot = slots.entry(user_id).or_default();
        slot.epoch += 1;
        slot.cached = None;
    }
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
