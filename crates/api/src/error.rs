use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pixora_core::error::CoreError;
use pixora_pipeline::error::GenerationError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors, [`GenerationError`] for the
/// generation pipeline, and adds HTTP-specific variants. Implements
/// [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type ErrorParts = (StatusCode, &'static str, String);

fn internal(context: &str, msg: &str) -> ErrorParts {
    tracing::error!(error = %msg, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Generation(err) => classify_generation_error(err),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> ErrorParts {
    match err {
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::InsufficientCredits { .. } => (
            StatusCode::PAYMENT_REQUIRED,
            "INSUFFICIENT_CREDITS",
            err.to_string(),
        ),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => internal("Internal core error", msg),
    }
}

/// Map a pipeline error. Persistence failures get their own code so clients
/// can tell "the model failed" apart from "your image was lost".
fn classify_generation_error(err: &GenerationError) -> ErrorParts {
    match err {
        GenerationError::Invalid(core) => classify_core_error(core),
        GenerationError::InsufficientCredits { .. } => (
            StatusCode::PAYMENT_REQUIRED,
            "INSUFFICIENT_CREDITS",
            err.to_string(),
        ),
        GenerationError::TerminalFailure { .. } => {
            (StatusCode::BAD_GATEWAY, "GENERATION_FAILED", err.to_string())
        }
        GenerationError::Cancelled { .. } => {
            (StatusCode::CONFLICT, "GENERATION_CANCELLED", err.to_string())
        }
        GenerationError::Persistence { .. } => {
            tracing::error!(error = %err, "Generation persistence failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_FAILED",
                err.to_string(),
            )
        }
        GenerationError::Ledger(msg) => {
            tracing::error!(error = %msg, "Credit ledger unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "CREDITS_UNAVAILABLE",
                "Credits are temporarily unavailable".to_string(),
            )
        }
        GenerationError::JobTracking(msg) => internal("Generation job tracking failed", msg),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorParts {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            internal("Database error", &db_err.to_string())
        }
        other => internal("Database error", &other.to_string()),
    }
}
