//! Retry policy for upstream inference calls.
//!
//! The policy is a fixed lookup table, not an exponential curve: each
//! retryable status maps to the delay that matches how the upstream service
//! recovers from it (throttle windows for 429, cold starts for 503).

use std::time::Duration;

/// Maximum number of retries after the first attempt.
pub const MAX_RETRIES: u32 = 5;

/// HTTP 429 Too Many Requests.
pub const STATUS_RATE_LIMITED: u16 = 429;
/// HTTP 500 Internal Server Error.
pub const STATUS_SERVER_ERROR: u16 = 500;
/// HTTP 503 Service Unavailable.
pub const STATUS_UNAVAILABLE: u16 = 503;
/// HTTP 504 Gateway Timeout.
pub const STATUS_TIMEOUT: u16 = 504;

/// Delay used for a status that is retryable but has no table entry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(5_000);

/// Outcome of consulting the policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub delay: Duration,
    /// The caller must switch to a fresh upstream credential before retrying.
    pub rotate_credential: bool,
}

impl RetryDecision {
    fn give_up() -> Self {
        Self {
            retry: false,
            delay: Duration::ZERO,
            rotate_credential: false,
        }
    }
}

/// Tunable retry table.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Status codes that may be retried.
    pub retryable: Vec<u16>,
    /// Fixed delay per status code.
    pub delays: Vec<(u16, Duration)>,
    /// Upper bound on retries for one request.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retryable: vec![
                STATUS_RATE_LIMITED,
                STATUS_SERVER_ERROR,
                STATUS_UNAVAILABLE,
                STATUS_TIMEOUT,
            ],
            delays: vec![
                (STATUS_RATE_LIMITED, Duration::from_millis(2_000)),
                (STATUS_SERVER_ERROR, Duration::from_millis(10_000)),
                (STATUS_UNAVAILABLE, Duration::from_millis(120_000)),
                (STATUS_TIMEOUT, Duration::from_millis(30_000)),
            ],
            max_retries: MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Decide whether a request that failed with `status` after `attempt`
    /// retries should be retried, and after how long.
    pub fn decide(&self, status: u16, attempt: u32) -> RetryDecision {
        if attempt >= self.max_retries || !self.retryable.contains(&status) {
            return RetryDecision::give_up();
        }

        let delay = self
            .delays
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, delay)| *delay)
            .unwrap_or(DEFAULT_RETRY_DELAY);

        RetryDecision {
            retry: true,
            delay,
            rotate_credential: status == STATUS_RATE_LIMITED,
        }
    }
}

/// Per-request retry bookkeeping. Discarded when the request finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Retries performed so far.
    pub attempt: u32,
    pub last_status: Option<u16>,
    pub last_error: Option<String>,
    pub next_delay: Option<Duration>,
}

impl RetryState {
    /// Record a failed attempt and return the policy's verdict.
    ///
    /// When the verdict is to retry, the attempt counter is advanced so the
    /// next failure is judged against the new count.
    pub fn record_failure(
        &mut self,
        policy: &RetryPolicy,
        status: u16,
        error: impl Into<String>,
    ) -> RetryDecision {
        let decision = policy.decide(status, self.attempt);
        self.last_status = Some(status);
        self.last_error = Some(error.into());
        if decision.retry {
            self.attempt += 1;
            self.next_delay = Some(decision.delay);
        } else {
            self.next_delay = None;
        }
        decision
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
