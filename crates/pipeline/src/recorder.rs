//! Image metadata recording.

use async_trait::async_trait;
use pixora_db::models::generated_image::{CreateGeneratedImage, GeneratedImage};
use pixora_db::repositories::GeneratedImageRepo;
use pixora_db::DbPool;

/// Writes the metadata row for a stored image.
#[async_trait]
pub trait ImageRecorder: Send + Sync {
    async fn record(&self, input: &CreateGeneratedImage) -> Result<GeneratedImage, String>;
}

pub struct PgImageRecorder {
    pool: DbPool,
}

impl PgImageRecorder {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRecorder for PgImageRecorder {
    async fn record(&self, input: &CreateGeneratedImage) -> Result<GeneratedImage, String> {
        GeneratedImageRepo::create(&self.pool, input)
            .await
            .map_err(|e| e.to_string())
    }
}
