//! Handler for the caller's credit balance.

use axum::extract::State;
use axum::Json;
use pixora_core::credits::CreditBalance;
use pixora_db::repositories::CreditRepo;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub base: i32,
    pub bonus: i32,
    pub total: i32,
}

impl From<CreditBalance> for BalanceResponse {
    fn from(balance: CreditBalance) -> Self {
        Self {
            base: balance.base,
            bonus: balance.bonus,
            total: balance.total(),
        }
    }
}

/// GET /api/v1/credits
///
/// Served from the balance cache when fresh. A first-time caller gets an
/// empty account created. A read that races a reservation or refund is
/// returned but not cached.
pub async fn get_balance(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<BalanceResponse>>> {
    if let Some(balance) = state.balance_cache.get(auth.user_id).await {
        return Ok(Json(DataResponse {
            data: balance.into(),
        }));
    }

    let epoch = state.balance_cache.epoch(auth.user_id).await;
    let balance = CreditRepo::ensure(&state.pool, auth.user_id)
        .await?
        .balance();
    state
        .balance_cache
        .put_if_unchanged(auth.user_id, epoch, balance)
        .await;

    Ok(Json(DataResponse {
        data: balance.into(),
    }))
}
