//! Generated image models and DTOs.
//!
//! Defines the database row struct for `generated_images` and the input
//! type used when the pipeline records a finished generation.

use pixora_core::error::CoreError;
use pixora_core::quality::QualityTier;
use pixora_core::types::{DbId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `generated_images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GeneratedImage {
    pub id: DbId,
    pub user_id: UserId,
    pub storage_key: String,
    pub prompt: String,
    pub seed: i64,
    pub width: i32,
    pub height: i32,
    pub model: String,
    pub style: Option<String>,
    pub quality: String,
    pub aspect_ratio: Option<String>,
    pub is_private: bool,
    pub is_hot: bool,
    pub is_trending: bool,
    pub created_at: Timestamp,
}

impl GeneratedImage {
    /// Parse the stored quality label.
    pub fn quality_tier(&self) -> Result<QualityTier, CoreError> {
        QualityTier::from_name(&self.quality)
    }

    /// Whether `viewer` may see this image.
    pub fn visible_to(&self, viewer: Option<UserId>) -> bool {
        !self.is_private || viewer == Some(self.user_id)
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for recording a freshly stored generation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGeneratedImage {
    pub user_id: UserId,
    pub storage_key: String,
    pub prompt: String,
    pub seed: i64,
    pub width: i32,
    pub height: i32,
    pub model: String,
    pub style: Option<String>,
    pub quality: String,
    pub aspect_ratio: Option<String>,
    pub is_private: bool,
}

// ---------------------------------------------------------------------------
// Admin flags DTO
// ---------------------------------------------------------------------------

/// Admin-set curation flags. `None` leaves a flag unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateImageFlags {
    pub is_hot: Option<bool>,
    pub is_trending: Option<bool>,
}
