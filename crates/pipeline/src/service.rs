//! Background generation jobs.
//!
//! [`GenerationService::submit`] validates and reserves credits inline, so
//! those failures reach the caller directly. It then opens a job row and
//! hands the retry loop to a tracked background task that writes the job's
//! terminal state and publishes the outcome.

use std::sync::Arc;

use pixora_core::credits::CreditBalance;
use pixora_core::generation::GenerationParams;
use pixora_core::types::{DbId, UserId};
use pixora_db::models::generation_job::{
    CreateGenerationJob, GenerationJob, JobFailure, FAILURE_PERSISTENCE, FAILURE_UPSTREAM,
    JOB_CANCELLED, JOB_FAILED,
};
use pixora_db::repositories::GenerationJobRepo;
use pixora_db::DbPool;
use pixora_events::bus::{GENERATION_FAILED, GENERATION_SUCCEEDED};
use pixora_events::{DomainEvent, EventBus};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::GenerationError;
use crate::orchestrator::{GenerationOrchestrator, Requester, Reservation};
use crate::registry::{CancelOutcome, JobRegistry};
use crate::state::{GenerationState, JobControl};

/// Entity type used in job events.
const ENTITY_JOB: &str = "generation_job";

/// A job accepted for background execution.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedJob {
    pub job: GenerationJob,
    pub cost: i32,
    pub balance_after: CreditBalance,
}

/// A job row plus its live state while it runs in this process.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub job: GenerationJob,
    pub live_state: Option<GenerationState>,
}

#[derive(Clone)]
pub struct GenerationService {
    orchestrator: Arc<GenerationOrchestrator>,
    pool: DbPool,
    registry: Arc<JobRegistry>,
    events: Arc<EventBus>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl GenerationService {
    pub fn new(orchestrator: Arc<GenerationOrchestrator>, pool: DbPool, events: Arc<EventBus>) -> Self {
        Self {
            orchestrator,
            pool,
            registry: Arc::new(JobRegistry::new()),
            events,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Validate, reserve, open a job row and start the job in the background.
    pub async fn submit(
        &self,
        requester: Requester,
        params: GenerationParams,
    ) -> Result<SubmittedJob, GenerationError> {
        let control = JobControl::new(self.shutdown.child_token());
        let reservation = self
            .orchestrator
            .prepare(requester, &params, &control)
            .await?;

        let job = match self.open_job(&reservation).await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(user_id = %requester.user_id, error = %e, "Failed to open generation job");
                if let Err(refund_err) = self
                    .orchestrator
                    .ledger()
                    .refund(reservation.user_id, reservation.spent)
                    .await
                {
                    tracing::error!(
                        user_id = %requester.user_id,
                        error = %refund_err,
                        "Credit refund failed",
                    );
                }
                return Err(GenerationError::JobTracking(e));
            }
        };

        self.registry
            .register(
                job.id,
                requester.user_id,
                control.cancel_token().clone(),
                control.subscribe(),
            )
            .await;

        tracing::info!(
            job_id = job.id,
            user_id = %requester.user_id,
            model = %reservation.request.model,
            quality = %reservation.request.quality,
            cost = reservation.cost,
            "Generation job started",
        );

        let service = self.clone();
        let job_id = job.id;
        let cost = reservation.cost;
        let balance_after = reservation.balance_after;
        self.tracker
            .spawn(async move { service.run_job(job_id, reservation, control).await });

        Ok(SubmittedJob {
            job,
            cost,
            balance_after,
        })
    }

    async fn open_job(&self, reservation: &Reservation) -> Result<GenerationJob, String> {
        let params = serde_json::to_value(&reservation.request).map_err(|e| e.to_string())?;
        GenerationJobRepo::create(
            &self.pool,
            &CreateGenerationJob {
                user_id: reservation.user_id,
                params,
                credits_reserved: reservation.cost,
            },
        )
        .await
        .map_err(|e| e.to_string())
    }

    async fn run_job(self, job_id: DbId, reservation: Reservation, control: JobControl) {
        let progress = tokio::spawn(record_progress(
            self.pool.clone(),
            job_id,
            control.subscribe(),
        ));

        let result = self.orchestrator.execute(&reservation, &control).await;
        // Closing the channel ends the progress writer.
        drop(control);
        let _ = progress.await;
        // A cancel arriving after this point is answered as not running.
        self.registry.remove(job_id).await;

        match result {
            Ok(success) => {
                let attempts = success.attempts as i32;
                match GenerationJobRepo::mark_succeeded(&self.pool, job_id, success.image.id, attempts)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!(
                            job_id,
                            image_id = success.image.id,
                            "Generation job already closed, success not recorded",
                        );
                    }
                    Err(e) => {
                        tracing::error!(job_id, error = %e, "Failed to mark generation job succeeded");
                    }
                }
                self.events.publish(
                    DomainEvent::new(GENERATION_SUCCEEDED)
                        .with_subject(ENTITY_JOB, job_id)
                        .with_user(reservation.user_id)
                        .with_payload(serde_json::json!({
                            "image_id": success.image.id,
                            "attempts": success.attempts,
                        })),
                );
            }
            Err(err) => {
                let (status, failure) = job_failure(&err);
                match GenerationJobRepo::mark_finished(&self.pool, job_id, status, &failure).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!(
                            job_id,
                            status,
                            "Generation job already closed, outcome not recorded",
                        );
                    }
                    Err(e) => {
                        tracing::error!(job_id, error = %e, "Failed to record generation job failure");
                    }
                }
                self.events.publish(
                    DomainEvent::new(GENERATION_FAILED)
                        .with_subject(ENTITY_JOB, job_id)
                        .with_user(reservation.user_id)
                        .with_payload(serde_json::json!({
                            "status": status,
                            "reason": err.to_string(),
                            "attempts": err.attempts(),
                            "credits_refunded": err.refunded(),
                        })),
                );
            }
        }
    }

    /// Load a job the caller owns, with live state if it is still running here.
    pub async fn find_job(
        &self,
        job_id: DbId,
        user_id: UserId,
    ) -> Result<Option<JobView>, sqlx::Error> {
        let Some(job) = GenerationJobRepo::find_by_id(&self.pool, job_id).await? else {
            return Ok(None);
        };
        if job.user_id != user_id {
            return Ok(None);
        }
        let live_state = self.registry.snapshot(job_id).await;
        Ok(Some(JobView { job, live_state }))
    }

    /// Number of jobs running in this process.
    pub async fn running_jobs(&self) -> usize {
        self.registry.len().await
    }

    pub async fn cancel(&self, job_id: DbId, user_id: UserId) -> CancelOutcome {
        self.registry.cancel(job_id, user_id).await
    }

    /// Cancel all running jobs and wait for them to write their final state.
    pub async fn shutdown(&self) {
        let running = self.registry.len().await;
        tracing::info!(running, "Cancelling running generation jobs");
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// Mirror retry progress into the job row while the job runs.
async fn record_progress(
    pool: DbPool,
    job_id: DbId,
    mut state: watch::Receiver<GenerationState>,
) {
    while state.changed().await.is_ok() {
        let current = state.borrow_and_update().clone();
        match current {
            GenerationState::Retrying {
                attempt,
                last_error,
                ..
            } => {
                if let Err(e) = GenerationJobRepo::record_attempts(
                    &pool,
                    job_id,
                    attempt as i32,
                    Some(last_error.as_str()),
                )
                .await
                {
                    tracing::warn!(job_id, error = %e, "Failed to record generation progress");
                }
            }
            s if s.is_terminal() => break,
            _ => {}
        }
    }
}

/// Terminal job status and failure details for an orchestrator error.
pub fn job_failure(err: &GenerationError) -> (&'static str, JobFailure) {
    match err {
        GenerationError::Cancelled { attempts, refunded } => (
            JOB_CANCELLED,
            JobFailure {
                attempts: *attempts as i32,
                credits_refunded: *refunded,
                ..JobFailure::default()
            },
        ),
        GenerationError::Persistence {
            message,
            orphaned_storage_key,
            attempts,
        } => (
            JOB_FAILED,
            JobFailure {
                failure_kind: Some(FAILURE_PERSISTENCE.to_string()),
                last_error: Some(message.clone()),
                attempts: *attempts as i32,
                credits_refunded: false,
                orphaned_storage_key: orphaned_storage_key.clone(),
            },
        ),
        GenerationError::TerminalFailure {
            message,
            attempts,
            refunded,
            ..
        } => (
            JOB_FAILED,
            JobFailure {
                failure_kind: Some(FAILURE_UPSTREAM.to_string()),
                last_error: Some(message.clone()),
                attempts: *attempts as i32,
                credits_refunded: *refunded,
                orphaned_storage_key: None,
            },
        ),
        other => (
            JOB_FAILED,
            JobFailure {
                last_error: Some(other.to_string()),
                ..JobFailure::default()
            },
        ),
    }
}
