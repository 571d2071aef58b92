//! Generation state machine and per-job control handle.
//!
//! ```text
//! Idle -> Validating -> CreditsReserved -> Calling -> (Retrying <-> Calling)
//!                                                  -> Succeeded | Failed
//! ```

use pixora_core::types::DbId;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Observable state of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GenerationState {
    Idle,
    Validating,
    CreditsReserved {
        cost: i32,
    },
    Calling {
        /// 1-based attempt number.
        attempt: u32,
    },
    Retrying {
        /// Retries performed so far, including the one being waited on.
        attempt: u32,
        status: u16,
        delay_ms: u64,
        last_error: String,
    },
    Succeeded {
        image_id: DbId,
    },
    Failed {
        reason: String,
    },
}

impl GenerationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::CreditsReserved { .. } => "credits_reserved",
            Self::Calling { .. } => "calling",
            Self::Retrying { .. } => "retrying",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}

/// Cancellation and state broadcast for one running generation.
///
/// The orchestrator reports every transition here; the job registry keeps a
/// receiver so clients can poll live state, and a cancel request trips the
/// token to abort the retry loop.
pub struct JobControl {
    cancel: CancellationToken,
    state: watch::Sender<GenerationState>,
}

impl JobControl {
    pub fn new(cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(GenerationState::Idle);
        Self { cancel, state }
    }

    /// Record a state transition.
    pub fn transition(&self, next: GenerationState) {
        tracing::debug!(state = next.name(), "Generation state transition");
        self.state.send_replace(next);
    }

    pub fn current(&self) -> GenerationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.state.subscribe()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for JobControl {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}
