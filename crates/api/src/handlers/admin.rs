//! Admin curation and credit handlers.

use axum::extract::{Path, State};
use axum::Json;
use pixora_core::credits::validate_grant;
use pixora_core::error::CoreError;
use pixora_core::types::{DbId, UserId};
use pixora_db::models::generated_image::{GeneratedImage, UpdateImageFlags};
use pixora_db::repositories::GeneratedImageRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::credits::BalanceResponse;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// PATCH /api/v1/admin/images/{id}/flags
///
/// Set the `is_hot` / `is_trending` curation flags. Omitted fields keep
/// their current value.
pub async fn update_image_flags(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateImageFlags>,
) -> AppResult<Json<DataResponse<GeneratedImage>>> {
    let image = GeneratedImageRepo::update_flags(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Image", id)))?;

    tracing::info!(
        image_id = id,
        admin_id = %admin.user_id,
        is_hot = image.is_hot,
        is_trending = image.is_trending,
        "Image flags updated",
    );
    Ok(Json(DataResponse { data: image }))
}

#[derive(Debug, Deserialize)]
pub struct GrantCredits {
    #[serde(default)]
    pub base: i32,
    #[serde(default)]
    pub bonus: i32,
}

/// POST /api/v1/admin/credits/{user_id}
///
/// Top up a user's base and bonus credits. Returns the new balance.
pub async fn grant_credits(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(input): Json<GrantCredits>,
) -> AppResult<Json<DataResponse<BalanceResponse>>> {
    validate_grant(input.base, input.bonus)?;
    let balance = state.ledger.grant(user_id, input.base, input.bonus).await?;

    tracing::info!(
        user_id = %user_id,
        admin_id = %admin.user_id,
        base = input.base,
        bonus = input.bonus,
        "Admin credit grant",
    );
    Ok(Json(DataResponse {
        data: balance.into(),
    }))
}
