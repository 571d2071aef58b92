//! Reconciliation of generation jobs that never finished.
//!
//! A job stays `running` if the process died between reserving credits and
//! writing the job's terminal state. This task marks such jobs `abandoned`
//! so they can be reconciled by hand. It does not refund: whether the
//! inference call succeeded is unknown. A job that was only slow and later
//! finishes overwrites `abandoned` with its real outcome.

use std::time::Duration;

use chrono::Utc;
use pixora_db::repositories::GenerationJobRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// One sweep: abandon running jobs not updated for `stale_after_mins`.
pub async fn sweep(pool: &PgPool, stale_after_mins: i64) -> Result<u64, sqlx::Error> {
    let cutoff = Utc::now() - chrono::Duration::minutes(stale_after_mins);
    GenerationJobRepo::mark_abandoned_before(pool, cutoff).await
}

/// Run the sweep on a fixed interval until `cancel` is triggered.
pub async fn run(pool: PgPool, stale_after_mins: i64, cancel: CancellationToken) {
    tracing::info!(
        stale_after_mins,
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Job janitor started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job janitor stopping");
                break;
            }
            _ = interval.tick() => {
                match sweep(&pool, stale_after_mins).await {
                    Ok(0) => tracing::debug!("Job janitor: no stale jobs"),
                    Ok(abandoned) => {
                        tracing::warn!(abandoned, "Job janitor: marked stale generation jobs abandoned");
                    }
                    Err(e) => tracing::error!(error = %e, "Job janitor: sweep failed"),
                }
            }
        }
    }
}
