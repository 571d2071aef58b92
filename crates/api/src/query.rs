//! Shared query parameter types for API handlers.

use pixora_core::types::DbId;
use serde::Deserialize;

/// Default page size for image listings.
pub const DEFAULT_LIMIT: i64 = 24;
/// Largest page a client may request.
pub const MAX_LIMIT: i64 = 100;

/// Keyset pagination (`?before=&limit=`). Results are newest first and
/// `before` is the smallest id of the previous page.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub before: Option<DbId>,
    pub limit: Option<i64>,
}

impl PageParams {
    /// Requested limit clamped to `1..=MAX_LIMIT`.
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Public feed filters (`?hot=true&trending=true`) plus pagination.
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub before: Option<DbId>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub hot: bool,
    #[serde(default)]
    pub trending: bool,
}

impl FeedParams {
    pub fn page(&self) -> PageParams {
        PageParams {
            before: self.before,
            limit: self.limit,
        }
    }
}
