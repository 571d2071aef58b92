//! In-memory index of generation jobs running in this process.

use std::collections::HashMap;

use pixora_core::types::{DbId, UserId};
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;

use crate::state::GenerationState;

struct LiveJob {
    user_id: UserId,
    cancel: CancellationToken,
    state: watch::Receiver<GenerationState>,
}

/// Result of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// No live job with that id in this process.
    NotRunning,
    /// The job belongs to someone else.
    NotOwner,
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<DbId, LiveJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        job_id: DbId,
        user_id: UserId,
        cancel: CancellationToken,
        state: watch::Receiver<GenerationState>,
    ) {
        self.jobs.write().await.insert(
            job_id,
            LiveJob {
                user_id,
                cancel,
                state,
            },
        );
    }

    /// Trip the cancel token of `job_id` if `user_id` owns it.
    pub async fn cancel(&self, job_id: DbId, user_id: UserId) -> CancelOutcome {
        let jobs = self.jobs.read().await;
        match jobs.get(&job_id) {
            None => CancelOutcome::NotRunning,
            Some(job) if job.user_id != user_id => CancelOutcome::NotOwner,
            Some(job) => {
                job.cancel.cancel();
                tracing::info!(job_id, user_id = %user_id, "Generation cancel requested");
                CancelOutcome::Cancelled
            }
        }
    }

    /// Live state of a running job.
    pub async fn snapshot(&self, job_id: DbId) -> Option<GenerationState> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .map(|job| job.state.borrow().clone())
    }

    pub async fn remove(&self, job_id: DbId) {
        self.jobs.write().await.remove(&job_id);
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}
