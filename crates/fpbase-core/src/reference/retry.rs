use std::thread::sleep;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{BaselineError, Result};

/// Bounded exponential backoff with an overall deadline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Hard limit on the whole lookup, retries and waits included.
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            deadline: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exp = attempt.saturating_sub(1).min(31) as u32;
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_backoff)
    }
}

/// Outcome of one failed attempt.
#[derive(Debug)]
pub enum AttemptError {
    /// Transient failure (connection reset, rate limit, 5xx, ...).
    Retryable(String),
    /// Failure that another attempt will not fix.
    Fatal(BaselineError),
}

/// HTTP statuses worth retrying.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504)
}

/// Run `op` until it succeeds, fails fatally, runs out of attempts or hits
/// the deadline.
///
/// `op` receives the time left before the deadline so it can bound its own
/// request timeout.
pub fn retry_with_backoff<T, F>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(Duration) -> std::result::Result<T, AttemptError>,
{
    let start = Instant::now();
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts.max(1) {
        let remaining = policy.deadline.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return Err(BaselineError::ReferenceTimeout {
                attempts: attempt - 1,
            });
        }

        match op(remaining) {
            Ok(value) => return Ok(value),
            Err(AttemptError::Fatal(e)) => return Err(e),
            Err(AttemptError::Retryable(msg)) => {
                warn!(attempt, error = %msg, "Reference lookup attempt failed");
                last_error = msg;
            }
        }

        if attempt < policy.max_attempts {
            let delay = policy.backoff(attempt);
            if start.elapsed() + delay >= policy.deadline {
                return Err(BaselineError::ReferenceTimeout { attempts: attempt });
            }
            sleep(delay);
        }
    }

    Err(BaselineError::ReferenceService(format!(
        "gave up after {} attempt(s): {}",
        policy.max_attempts.max(1),
        last_error
    )))
}
