use pixora_core::error::CoreError;
use pixora_core::quality::QualityTier;

/// Terminal outcome of a generation that did not produce a stored image.
///
/// Transient upstream failures never surface here: they are absorbed by
/// the retry loop and become [`GenerationError::TerminalFailure`] once the
/// retry policy gives up.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Request rejected before any credits or network were touched.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error(
        "Insufficient credits: a {tier} generation costs {required} credits, {available} available"
    )]
    InsufficientCredits {
        tier: QualityTier,
        required: i32,
        available: i32,
    },

    /// Non-retryable status, retries exhausted, transport failure, or an
    /// empty payload.
    #[error("Generation failed after {attempts} attempt(s): {message}")]
    TerminalFailure {
        status: Option<u16>,
        message: String,
        attempts: u32,
        refunded: bool,
    },

    #[error("Generation cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32, refunded: bool },

    /// Inference succeeded but the image could not be stored or recorded.
    /// Credits stay spent.
    #[error("Generated image could not be saved: {message}")]
    Persistence {
        message: String,
        /// Set when the binary reached storage but its row was not written.
        orphaned_storage_key: Option<String>,
        attempts: u32,
    },

    #[error("Credit ledger unavailable: {0}")]
    Ledger(String),

    #[error("Generation job could not be recorded: {0}")]
    JobTracking(String),
}

impl GenerationError {
    /// Number of upstream calls made before the error, where meaningful.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::TerminalFailure { attempts, .. }
            | Self::Cancelled { attempts, .. }
            | Self::Persistence { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    /// Whether reserved credits were returned to the user.
    pub fn refunded(&self) -> bool {
        match self {
            Self::TerminalFailure { refunded, .. } | Self::Cancelled { refunded, .. } => *refunded,
            _ => false,
        }
    }
}
