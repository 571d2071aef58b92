//! Repository for the `credit_accounts` table.
//!
//! Every balance mutation is a single statement. Reservation in particular
//! is a conditional `UPDATE ... WHERE base + bonus >= cost` on a locked row,
//! so concurrent generations for the same user can never overdraw the
//! account, and it reports the per-pool split so a refund can undo it.

use pixora_core::credits::CreditSpend;
use pixora_core::types::UserId;
use sqlx::PgPool;

use crate::models::credit_account::{CreditAccount, CreditReservation};

/// Column list for credit_accounts queries.
const COLUMNS: &str = "user_id, base_credits, bonus_credits, created_at, updated_at";

/// Provides atomic balance operations on credit accounts.
pub struct CreditRepo;

impl CreditRepo {
    /// Find a user's account.
    pub async fn find(pool: &PgPool, user_id: UserId) -> Result<Option<CreditAccount>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM credit_accounts WHERE user_id = $1");
        sqlx::query_as::<_, CreditAccount>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Return the user's account, creating an empty one on first use.
    pub async fn ensure(pool: &PgPool, user_id: UserId) -> Result<CreditAccount, sqlx::Error> {
        let query = format!(
            "INSERT INTO credit_accounts (user_id) VALUES ($1)
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CreditAccount>(&query)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Add base and bonus credits, creating the account if needed.
    pub async fn grant(
        pool: &PgPool,
        user_id: UserId,
        base: i32,
        bonus: i32,
    ) -> Result<CreditAccount, sqlx::Error> {
        let query = format!(
            "INSERT INTO credit_accounts (user_id, base_credits, bonus_credits)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id) DO UPDATE SET
                base_credits = credit_accounts.base_credits + EXCLUDED.base_credits,
                bonus_credits = credit_accounts.bonus_credits + EXCLUDED.bonus_credits,
                updated_at = now()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CreditAccount>(&query)
            .bind(user_id)
            .bind(base)
            .bind(bonus)
            .fetch_one(pool)
            .await
    }

    /// Atomically deduct `cost` if the account can cover it.
    ///
    /// Base credits are drained first and the remainder comes from bonus
    /// credits. Returns the updated account with the amount taken from each
    /// pool, or `None` when the account is missing or its total is below
    /// `cost` (in which case nothing changed).
    pub async fn reserve(
        pool: &PgPool,
        user_id: UserId,
        cost: i32,
    ) -> Result<Option<CreditReservation>, sqlx::Error> {
        // `prior` locks the row and keeps its pre-update base balance;
        // right-hand sides of SET all see the pre-update row too.
        let query = format!(
            "WITH prior AS (
                SELECT user_id AS locked_user_id, base_credits AS base_before
                FROM credit_accounts
                WHERE user_id = $1 AND base_credits + bonus_credits >= $2
                FOR UPDATE
             )
             UPDATE credit_accounts SET
                base_credits = GREATEST(base_credits - $2, 0),
                bonus_credits = bonus_credits - GREATEST($2 - base_credits, 0),
                updated_at = now()
             FROM prior
             WHERE user_id = prior.locked_user_id
             RETURNING {COLUMNS},
                LEAST(GREATEST(prior.base_before, 0), $2) AS base_spent,
                $2 - LEAST(GREATEST(prior.base_before, 0), $2) AS bonus_spent"
        );
        sqlx::query_as::<_, CreditReservation>(&query)
            .bind(user_id)
            .bind(cost)
            .fetch_optional(pool)
            .await
    }

    /// Give back a reservation's credits to the pools they came from.
    pub async fn refund(
        pool: &PgPool,
        user_id: UserId,
        spend: CreditSpend,
    ) -> Result<Option<CreditAccount>, sqlx::Error> {
        let query = format!(
            "UPDATE credit_accounts SET
                base_credits = base_credits + $2,
                bonus_credits = bonus_credits + $3,
                updated_at = now()
             WHERE user_id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CreditAccount>(&query)
            .bind(user_id)
            .bind(spend.base)
            .bind(spend.bonus)
            .fetch_optional(pool)
            .await
    }
}
