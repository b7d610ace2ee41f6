//! Scheduler configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the job scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker tasks draining the queue.
    /// At most this many jobs run at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_jobs: usize,

    /// Maximum active (non-terminal) jobs per identity.
    /// Further submissions are rejected until one finishes.
    #[serde(default = "default_max_per_identity")]
    pub max_per_identity: usize,

    /// Whole-job wall clock in seconds, queue wait excluded.
    /// Expiry moves the job to TimedOut and sweeps its artifacts.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_max_per_identity() -> usize {
    2
}

fn default_job_timeout() -> u64 {
    300 // 5 minutes
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent(),
            max_per_identity: default_max_per_identity(),
            job_timeout_secs: default_job_timeout(),
        }
    }
}
