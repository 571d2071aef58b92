//! Generation job models.
//!
//! A job row tracks one generation from credit reservation to a terminal
//! state. It is the reconciliation record for crashes between the credit
//! deduction and image persistence.

use pixora_core::types::{DbId, Timestamp, UserId};
use serde::Serialize;
use sqlx::FromRow;

/// Job owned by a live orchestrator task.
pub const JOB_RUNNING: &str = "running";
/// Image stored and recorded.
pub const JOB_SUCCEEDED: &str = "succeeded";
/// Terminal failure (upstream or persistence).
pub const JOB_FAILED: &str = "failed";
/// Cancelled by the user or by shutdown.
pub const JOB_CANCELLED: &str = "cancelled";
/// Still running long after it should have finished; needs reconciliation.
pub const JOB_ABANDONED: &str = "abandoned";

/// Failure kind: upstream retries exhausted, non-retryable status or empty payload.
pub const FAILURE_UPSTREAM: &str = "upstream";
/// Failure kind: inference succeeded but storing or recording the image failed.
pub const FAILURE_PERSISTENCE: &str = "persistence";

/// A row from the `generation_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationJob {
    pub id: DbId,
    pub user_id: UserId,
    pub params: serde_json::Value,
    pub status: String,
    pub credits_reserved: i32,
    pub credits_refunded: bool,
    pub attempts: i32,
    pub failure_kind: Option<String>,
    pub last_error: Option<String>,
    pub image_id: Option<DbId>,
    pub orphaned_storage_key: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GenerationJob {
    pub fn is_running(&self) -> bool {
        self.status == JOB_RUNNING
    }
}

/// Input for opening a job once credits are reserved.
#[derive(Debug, Clone)]
pub struct CreateGenerationJob {
    pub user_id: UserId,
    pub params: serde_json::Value,
    pub credits_reserved: i32,
}

/// Terminal failure details written when a job fails or is cancelled.
#[derive(Debug, Clone, Default)]
pub struct JobFailure {
    pub failure_kind: Option<String>,
    pub last_error: Option<String>,
    pub attempts: i32,
    pub credits_refunded: bool,
    pub orphaned_storage_key: Option<String>,
}
