//! Credit account rows.

use pixora_core::credits::{CreditBalance, CreditSpend};
use pixora_core::types::{Timestamp, UserId};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `credit_accounts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditAccount {
    pub user_id: UserId,
    pub base_credits: i32,
    pub bonus_credits: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CreditAccount {
    pub fn balance(&self) -> CreditBalance {
        CreditBalance::new(self.base_credits, self.bonus_credits)
    }
}

/// An account after a successful reservation, with what was taken from each pool.
#[derive(Debug, Clone, FromRow)]
pub struct CreditReservation {
    #[sqlx(flatten)]
    pub account: CreditAccount,
    pub base_spent: i32,
    pub bonus_spent: i32,
}

impl CreditReservation {
    pub fn spend(&self) -> CreditSpend {
        CreditSpend {
            base: self.base_spent,
            bonus: self.bonus_spent,
        }
    }
}
