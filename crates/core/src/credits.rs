//! Credit arithmetic.
//!
//! The authoritative deduction is a single conditional `UPDATE` in the
//! database (see `pixora_db::repositories::CreditRepo`). This module is the
//! same split expressed as a pure function, used by in-memory ledgers and to
//! describe balances to clients.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A user's spendable credits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    pub base: i32,
    pub bonus: i32,
}

impl CreditBalance {
    pub fn new(base: i32, bonus: i32) -> Self {
        Self { base, bonus }
    }

    pub fn total(&self) -> i32 {
        self.base + self.bonus
    }

    /// How `cost` would be paid: base credits first, the rest from bonus.
    ///
    /// Fails with [`CoreError::InsufficientCredits`] when the total does not
    /// cover the cost.
    pub fn split(&self, cost: i32) -> Result<CreditSpend, CoreError> {
        if cost < 0 {
            return Err(CoreError::Validation(format!(
                "Credit cost must not be negative (got {cost})"
            )));
        }
        if self.total() < cost {
            return Err(CoreError::InsufficientCredits {
                required: cost,
                available: self.total(),
            });
        }
        let base = cost.min(self.base.max(0));
        Ok(CreditSpend {
            base,
            bonus: cost - base,
        })
    }

    /// Deduct `cost`, draining base credits before bonus credits.
    ///
    /// Returns the new balance and how it was paid, with `self` left
    /// untouched on error.
    pub fn deduct(&self, cost: i32) -> Result<(CreditBalance, CreditSpend), CoreError> {
        let spend = self.split(cost)?;
        let after = CreditBalance {
            base: self.base - spend.base,
            bonus: self.bonus - spend.bonus,
        };
        Ok((after, spend))
    }

    /// Return a reservation to the pools it was taken from.
    pub fn refund(&self, spend: CreditSpend) -> CreditBalance {
        CreditBalance {
            base: self.base + spend.base,
            bonus: self.bonus + spend.bonus,
        }
    }
}

/// Check an administrative top-up: no negative amounts, not empty.
pub fn validate_grant(base: i32, bonus: i32) -> Result<(), CoreError> {
    if base < 0 || bonus < 0 {
        return Err(CoreError::Validation(format!(
            "Granted credits must not be negative (base {base}, bonus {bonus})"
        )));
    }
    if base == 0 && bonus == 0 {
        return Err(CoreError::Validation(
            "A grant must add base or bonus credits".to_string(),
        ));
    }
    Ok(())
}

/// The credits taken by one reservation, per pool.
///
/// Refunds give back exactly this, so a refunded generation leaves the
/// balance as it was.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSpend {
    pub base: i32,
    pub bonus: i32,
}

impl CreditSpend {
    pub fn total(&self) -> i32 {
        self.base + self.bonus
    }
}
