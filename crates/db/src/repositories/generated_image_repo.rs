//! Repository for the `generated_images` table.

use pixora_core::types::{DbId, UserId};
use sqlx::PgPool;

use crate::models::generated_image::{CreateGeneratedImage, GeneratedImage, UpdateImageFlags};

/// Column list for generated_images queries.
const COLUMNS: &str = "id, user_id, storage_key, prompt, seed, width, height, \
    model, style, quality, aspect_ratio, is_private, is_hot, is_trending, created_at";

/// Filters for the public gallery feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedFilter {
    /// Only return images with an id strictly below this cursor.
    pub before: Option<DbId>,
    pub hot_only: bool,
    pub trending_only: bool,
}

/// Provides CRUD and feed queries for generated images.
pub struct GeneratedImageRepo;

impl GeneratedImageRepo {
    /// Insert a new image row, returning it.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGeneratedImage,
    ) -> Result<GeneratedImage, sqlx::Error> {
        let query = format!(
            "INSERT INTO generated_images
                (user_id, storage_key, prompt, seed, width, height,
                 model, style, quality, aspect_ratio, is_private)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(input.user_id)
            .bind(&input.storage_key)
            .bind(&input.prompt)
            .bind(input.seed)
            .bind(input.width)
            .bind(input.height)
            .bind(&input.model)
            .bind(&input.style)
            .bind(&input.quality)
            .bind(&input.aspect_ratio)
            .bind(input.is_private)
            .fetch_one(pool)
            .await
    }

    /// Find an image by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<GeneratedImage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generated_images WHERE id = $1");
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Public feed, newest first, keyset-paginated on `id`.
    pub async fn list_public(
        pool: &PgPool,
        filter: FeedFilter,
        limit: i64,
    ) -> Result<Vec<GeneratedImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_images
             WHERE is_private = false
               AND ($1::BIGINT IS NULL OR id < $1)
               AND (NOT $2 OR is_hot)
               AND (NOT $3 OR is_trending)
             ORDER BY id DESC
             LIMIT $4"
        );
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(filter.before)
            .bind(filter.hot_only)
            .bind(filter.trending_only)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// A user's own images, private ones included, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: UserId,
        before: Option<DbId>,
        limit: i64,
    ) -> Result<Vec<GeneratedImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_images
             WHERE user_id = $1 AND ($2::BIGINT IS NULL OR id < $2)
             ORDER BY id DESC
             LIMIT $3"
        );
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(user_id)
            .bind(before)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Delete an image owned by `user_id`, returning the removed row so the
    /// caller can drop the storage object.
    pub async fn delete_owned(
        pool: &PgPool,
        id: DbId,
        user_id: UserId,
    ) -> Result<Option<GeneratedImage>, sqlx::Error> {
        let query = format!(
            "DELETE FROM generated_images WHERE id = $1 AND user_id = $2 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Set the privacy flag on an image owned by `user_id`.
    pub async fn set_privacy(
        pool: &PgPool,
        id: DbId,
        user_id: UserId,
        is_private: bool,
    ) -> Result<Option<GeneratedImage>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_images SET is_private = $3
             WHERE id = $1 AND user_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(id)
            .bind(user_id)
            .bind(is_private)
            .fetch_optional(pool)
            .await
    }

    /// Update admin curation flags. Only non-`None` fields change.
    pub async fn update_flags(
        pool: &PgPool,
        id: DbId,
        input: &UpdateImageFlags,
    ) -> Result<Option<GeneratedImage>, sqlx::Error> {
        let query = format!(
            "UPDATE generated_images SET
                is_hot = COALESCE($2, is_hot),
                is_trending = COALESCE($3, is_trending)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(id)
            .bind(input.is_hot)
            .bind(input.is_trending)
            .fetch_optional(pool)
            .await
    }
}
