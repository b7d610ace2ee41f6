//! Sliding-window admission control shared across workers.

use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Admission timestamps for one scope, bounded to the trailing window.
#[derive(Debug, Default)]
struct Window {
    admissions: VecDeque<Instant>,
}

impl Window {
    /// Drop admissions older than `now - window`.
    fn evict(&mut self, now: Instant, window: Duration) {
        while let Some(&front) = self.admissions.front() {
            if now.duration_since(front) >= window {
                self.admissions.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Sliding-window rate limiter, keyed by an arbitrary scope string
/// (one scope per platform, or a single global scope).
///
/// [`RateLimiter::admit`] suspends the caller until the scope has fewer than
/// `max_requests` admissions inside the trailing window, then records one.
/// Across any window of the configured length, admitted count never exceeds
/// `max_requests`.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    scopes: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// Wait until an admission slot is free for `scope`, then take it.
    pub async fn admit(&self, scope: &str) {
        loop {
            let wait = {
                let mut scopes = self.scopes.lock().await;
                let window = scopes.entry(scope.to_string()).or_default();
                let now = Instant::now();
                window.evict(now, self.window);

                // Oldest admission determines when a slot frees up. The lock
                // is released while sleeping so other scopes keep flowing.
                match window.admissions.front() {
                    Some(&oldest) if window.admissions.len() >= self.max_requests => {
                        self.window - now.duration_since(oldest)
                    }
                    _ => {
                        window.admissions.push_back(now);
                        return;
                    }
                }
            };

            tracing::debug!(scope, wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Admissions still available in the current window for `scope`.
    pub async fn remaining(&self, scope: &str) -> usize {
        let mut scopes = self.scopes.lock().await;
        match scopes.get_mut(scope) {
            Some(window) => {
                window.evict(Instant::now(), self.window);
                self.max_requests - window.admissions.len()
            }
            None => self.max_requests,
        }
    }
}
