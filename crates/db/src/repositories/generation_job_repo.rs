//! Repository for the `generation_jobs` table.

use pixora_core::types::{DbId, Timestamp, UserId};
use sqlx::PgPool;

use crate::models::generation_job::{
    CreateGenerationJob, GenerationJob, JobFailure, JOB_ABANDONED, JOB_RUNNING, JOB_SUCCEEDED,
};

/// Column list for generation_jobs queries.
const COLUMNS: &str = "id, user_id, params, status, credits_reserved, credits_refunded, \
    attempts, failure_kind, last_error, image_id, orphaned_storage_key, created_at, updated_at";

/// Provides lifecycle operations for generation jobs.
pub struct GenerationJobRepo;

impl GenerationJobRepo {
    /// Open a running job.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGenerationJob,
    ) -> Result<GenerationJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_jobs (user_id, params, credits_reserved, status)
             VALUES ($1, $2, $3, '{JOB_RUNNING}')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(input.user_id)
            .bind(&input.params)
            .bind(input.credits_reserved)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_jobs WHERE id = $1");
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Record the latest attempt count while the job is still running.
    pub async fn record_attempts(
        pool: &PgPool,
        id: DbId,
        attempts: i32,
        last_error: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_jobs SET
                attempts = $2,
                last_error = COALESCE($3, last_error),
                updated_at = now()
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(attempts)
        .bind(last_error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a running job as succeeded. Returns `true` if a row was updated.
    ///
    /// A job the janitor already abandoned still takes its real outcome.
    pub async fn mark_succeeded(
        pool: &PgPool,
        id: DbId,
        image_id: DbId,
        attempts: i32,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs SET
                status = '{JOB_SUCCEEDED}',
                image_id = $2,
                attempts = $3,
                updated_at = now()
             WHERE id = $1 AND status IN ('{JOB_RUNNING}', '{JOB_ABANDONED}')"
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(image_id)
            .bind(attempts)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a running or abandoned job to a terminal non-success `status`
    /// (`failed` or `cancelled`). Returns `true` if a row was updated.
    pub async fn mark_finished(
        pool: &PgPool,
        id: DbId,
        status: &str,
        failure: &JobFailure,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs SET
                status = $2,
                failure_kind = $3,
                last_error = $4,
                attempts = $5,
                credits_refunded = $6,
                orphaned_storage_key = $7,
                updated_at = now()
             WHERE id = $1 AND status IN ('{JOB_RUNNING}', '{JOB_ABANDONED}')"
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(status)
            .bind(&failure.failure_kind)
            .bind(&failure.last_error)
            .bind(failure.attempts)
            .bind(failure.credits_refunded)
            .bind(&failure.orphaned_storage_key)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark running jobs untouched since `cutoff` as abandoned.
    /// Returns the number of rows affected.
    pub async fn mark_abandoned_before(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs SET
                status = '{JOB_ABANDONED}',
                updated_at = now()
             WHERE status = '{JOB_RUNNING}' AND updated_at < $1"
        );
        let result = sqlx::query(&query).bind(cutoff).execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// A user's most recent jobs, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<GenerationJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_jobs
             WHERE user_id = $1
             ORDER BY id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
