//! Domain errors shared by every crate in the workspace.
//!
//! The API maps each variant to a status code and a stable error code, so
//! new variants need a matching arm in `pixora_api::error`.

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A row the caller asked for does not exist, or is not theirs to see.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// The request is malformed or not allowed by the model catalog.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The caller's base plus bonus credits do not cover the cost.
    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: i32, available: i32 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        Self::NotFound { entity, id }
    }
}
