//! Handlers for the `/generations` resource.
//!
//! Submission validates and reserves credits synchronously, so a bad request
//! or an empty balance is answered immediately (400 / 402). Everything after
//! that runs as a background job the client polls.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pixora_core::error::CoreError;
use pixora_core::generation::GenerationParams;
use pixora_core::types::DbId;
use pixora_db::repositories::GenerationJobRepo;
use pixora_pipeline::orchestrator::Requester;
use pixora_pipeline::registry::CancelOutcome;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PageParams;
use crate::response::DataResponse;
use crate::state::AppState;

fn job_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::not_found("GenerationJob", id))
}

/// POST /api/v1/generations
///
/// Returns 202 with the job row, the credits charged and the balance after
/// the charge.
pub async fn submit_generation(
    auth: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<GenerationParams>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(params) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let requester = Requester {
        user_id: auth.user_id,
        premium: auth.premium,
    };
    let submitted = state.generations.submit(requester, params).await?;

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: submitted })))
}

/// GET /api/v1/generations
///
/// The caller's most recent jobs, newest first.
pub async fn list_generations(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<impl IntoResponse> {
    let jobs = GenerationJobRepo::list_for_user(&state.pool, auth.user_id, params.limit()).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/generations/{id}
///
/// Job row plus live state while the job is running. Other users' jobs are
/// reported as not found.
pub async fn get_generation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let view = state
        .generations
        .find_job(id, auth.user_id)
        .await?
        .ok_or_else(|| job_not_found(id))?;
    Ok(Json(DataResponse { data: view }))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: DbId,
    pub cancel_requested: bool,
}

/// POST /api/v1/generations/{id}/cancel
///
/// Trips the job's cancel token. The job refunds its credits and records the
/// cancellation itself, so this returns 202 before that happens.
pub async fn cancel_generation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    match state.generations.cancel(id, auth.user_id).await {
        CancelOutcome::Cancelled => Ok((
            StatusCode::ACCEPTED,
            Json(DataResponse {
                data: CancelResponse {
                    job_id: id,
                    cancel_requested: true,
                },
            }),
        )),
        CancelOutcome::NotOwner => Err(job_not_found(id)),
        CancelOutcome::NotRunning => {
            let view = state
                .generations
                .find_job(id, auth.user_id)
                .await?
                .ok_or_else(|| job_not_found(id))?;
            Err(AppError::Core(CoreError::Conflict(format!(
                "Generation job {id} is not running (status: {})",
                view.job.status
            ))))
        }
    }
}
