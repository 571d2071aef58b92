//! Handlers for the image gallery.
//!
//! Private images are only visible to their owner; everyone else gets a 404
//! so private ids cannot be probed.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pixora_core::error::CoreError;
use pixora_core::generation::GenerationParams;
use pixora_core::types::{DbId, UserId};
use pixora_db::models::generated_image::GeneratedImage;
use pixora_db::repositories::generated_image_repo::FeedFilter;
use pixora_db::repositories::GeneratedImageRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::{FeedParams, PageParams};
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn image_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::not_found("Image", id))
}

/// Fetch an image `viewer` is allowed to see.
async fn find_visible(
    state: &AppState,
    id: DbId,
    viewer: Option<UserId>,
) -> AppResult<GeneratedImage> {
    GeneratedImageRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|image| image.visible_to(viewer))
        .ok_or_else(|| image_not_found(id))
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// GET /api/v1/images
///
/// Public feed, newest first. `before` is the keyset cursor.
pub async fn list_feed(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> AppResult<Json<PageResponse<GeneratedImage>>> {
    let filter = FeedFilter {
        before: params.before,
        hot_only: params.hot,
        trending_only: params.trending,
    };
    let limit = params.page().limit();
    let images = GeneratedImageRepo::list_public(&state.pool, filter, limit).await?;
    Ok(Json(PageResponse::new(images, limit, |image| image.id)))
}

/// GET /api/v1/users/me/images
pub async fn list_my_images(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<PageResponse<GeneratedImage>>> {
    let limit = params.limit();
    let images =
        GeneratedImageRepo::list_for_user(&state.pool, auth.user_id, params.before, limit).await?;
    Ok(Json(PageResponse::new(images, limit, |image| image.id)))
}

// ---------------------------------------------------------------------------
// Single image
// ---------------------------------------------------------------------------

/// GET /api/v1/images/{id}
pub async fn get_image(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<GeneratedImage>>> {
    let image = find_visible(&state, id, auth.map(|a| a.user_id)).await?;
    Ok(Json(DataResponse { data: image }))
}

/// DELETE /api/v1/images/{id}
///
/// Removes the row, then the stored binary. A storage failure is logged
/// and does not fail the request.
pub async fn delete_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let image = GeneratedImageRepo::delete_owned(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(|| image_not_found(id))?;

    if let Err(e) = state.store.delete(&image.storage_key).await {
        tracing::warn!(
            image_id = id,
            storage_key = %image.storage_key,
            error = %e,
            "Failed to delete stored image",
        );
    }

    tracing::info!(image_id = id, user_id = %auth.user_id, "Image deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PrivacyInput {
    pub is_private: bool,
}

/// PATCH /api/v1/images/{id}/privacy
pub async fn set_privacy(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<PrivacyInput>,
) -> AppResult<Json<DataResponse<GeneratedImage>>> {
    let image = GeneratedImageRepo::set_privacy(&state.pool, id, auth.user_id, input.is_private)
        .await?
        .ok_or_else(|| image_not_found(id))?;
    Ok(Json(DataResponse { data: image }))
}

/// GET /api/v1/images/{id}/remix
///
/// Generation parameters pre-filled from an existing image. The seed is
/// cleared so the remix produces a new variation.
pub async fn remix_image(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<GenerationParams>>> {
    let image = find_visible(&state, id, auth.map(|a| a.user_id)).await?;
    let params = remix_params(&image)?;
    Ok(Json(DataResponse { data: params }))
}

fn remix_params(image: &GeneratedImage) -> Result<GenerationParams, CoreError> {
    Ok(GenerationParams {
        prompt: image.prompt.clone(),
        model: image.model.clone(),
        style: image.style.clone(),
        quality: image.quality_tier()?,
        aspect_ratio: image.aspect_ratio.clone(),
        width: u32::try_from(image.width).ok(),
        height: u32::try_from(image.height).ok(),
        seed: None,
        steps: None,
        is_private: image.is_private,
    })
}

#[cfg(test)]
mod tests {
    use pixora_core::quality::QualityTier;

    use super::*;

    fn image() -> GeneratedImage {
        GeneratedImage {
            id: 1,
            user_id: UserId::new_v4(),
            storage_key: "u/a.png".into(),
            prompt: "a red fox".into(),
            seed: 1234,
            width: 1024,
            height: 576,
            model: "flux".into(),
            style: Some("anime".into()),
            quality: "HD".into(),
            aspect_ratio: Some("16:9".into()),
            is_private: false,
            is_hot: false,
            is_trending: false,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn remix_copies_parameters_and_clears_seed() {
        let params = remix_params(&image()).unwrap();
        assert_eq!(params.prompt, "a red fox");
        assert_eq!(params.quality, QualityTier::Hd);
        assert_eq!(params.style.as_deref(), Some("anime"));
        assert_eq!(params.aspect_ratio.as_deref(), Some("16:9"));
        assert_eq!(params.width, Some(1024));
        assert_eq!(params.seed, None);
    }

    #[test]
    fn remix_rejects_unknown_stored_quality() {
        let mut img = image();
        img.quality = "8K".into();
        assert!(remix_params(&img).is_err());
    }
}
