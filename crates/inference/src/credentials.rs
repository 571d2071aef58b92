//! Rotating pool of upstream API credentials.
//!
//! Upstream rate limits are per credential, so when a call is throttled
//! (HTTP 429) the caller rotates to the next credential before retrying.
//! The cursor is shared by every request using the pool.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Errors building a credential pool.
#[derive(Debug, thiserror::Error)]
pub enum CredentialPoolError {
    #[error("At least one inference API credential is required")]
    Empty,
}

/// A non-empty, round-robin set of bearer credentials.
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Build a pool from explicit credentials. Blank entries are dropped.
    pub fn new(keys: Vec<String>) -> Result<Self, CredentialPoolError> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            return Err(CredentialPoolError::Empty);
        }
        Ok(Self {
            keys,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Parse a comma-separated list (the `INFERENCE_API_KEYS` format).
    pub fn from_comma_separated(raw: &str) -> Result<Self, CredentialPoolError> {
        Self::new(raw.split(',').map(str::to_string).collect())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The credential currently in use.
    pub fn current(&self) -> &str {
        &self.keys[self.cursor.load(Ordering::Relaxed) % self.keys.len()]
    }

    /// Advance to the next credential and return its index.
    pub fn rotate(&self) -> usize {
        let next = (self.cursor.fetch_add(1, Ordering::Relaxed) + 1) % self.keys.len();
        tracing::info!(
            credential_index = next,
            pool_size = self.keys.len(),
            "Rotated inference credential"
        );
        next
    }
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("size", &self.keys.len())
            .finish_non_exhaustive()
    }
}
