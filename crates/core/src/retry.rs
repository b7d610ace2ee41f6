//! Generic retry wrapper with exponential backoff.
//!
//! The engine knows nothing about the wrapped operation: errors classify
//! themselves through [`Retryable`], and the backoff policy decides how long
//! to wait between attempts.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::Duration;

/// Whether a failure is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Invalid input, auth rejection, unsupported content. Never retried.
    Permanent,
    /// Timeout, connection failure, 5xx, rate-limit signal. Retried.
    Transient,
}

/// Implemented by error types the retry engine can act on.
pub trait Retryable {
    fn error_class(&self) -> ErrorClass;
}

/// Exponential backoff bounds for one retry sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Wait before the second attempt.
    pub initial_wait: Duration,
    /// Upper bound for any single wait.
    pub max_wait: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_secs(2),
            max_wait: Duration::from_secs(60),
        }
    }
}

impl BackoffPolicy {
    /// Base delay after a failed `attempt` (1-indexed):
    /// `min(initial * 2^(attempt-1), max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_wait
            .saturating_mul(factor)
            .min(self.max_wait)
    }

    /// Base delay plus bounded jitter (at most half the base delay).
    fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.delay_for(attempt);
        let jitter_cap = base.as_millis() as u64 / 2;
        if jitter_cap == 0 {
            return base;
        }
        let jitter = rand::rng().random_range(0..=jitter_cap);
        base + Duration::from_millis(jitter)
    }
}

/// Run `op` under `policy`, retrying transient failures.
///
/// `op` receives the 1-indexed attempt number. Permanent errors surface
/// immediately with zero retries; transient errors are retried with
/// exponential backoff until `max_attempts` is exhausted, at which point the
/// last error surfaces.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &BackoffPolicy, mut op: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if e.error_class() == ErrorClass::Permanent {
                    return Err(e);
                }
                if attempt >= max_attempts {
                    tracing::warn!(attempt, "retries exhausted: {}", e);
                    return Err(e);
                }

                let delay = policy.jittered_delay(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure, retrying: {}",
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
