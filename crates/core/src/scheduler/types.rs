//! Job model and scheduler error types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::{Platform, PlatformError};

/// Lifecycle state of a download job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    /// Waiting in the FIFO queue at the given position.
    Queued { position: u64 },
    /// A worker is acquiring the content.
    Running { started_at: DateTime<Utc> },
    /// Artifacts are being shipped to the recipient.
    Uploading { percent: f32 },
    /// All artifacts delivered.
    Completed {
        delivered_artifacts: usize,
        completed_at: DateTime<Utc>,
    },
    /// Acquisition or delivery failed.
    Failed { reason: String },
    /// Cancelled by the submitter.
    Cancelled,
    /// The whole-job wall clock expired.
    TimedOut { timeout_secs: u64 },
}

impl JobState {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed { .. }
                | JobState::Failed { .. }
                | JobState::Cancelled
                | JobState::TimedOut { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobState::Queued { .. } => "queued",
            JobState::Running { .. } => "running",
            JobState::Uploading { .. } => "uploading",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
            JobState::Cancelled => "cancelled",
            JobState::TimedOut { .. } => "timed_out",
        }
    }
}

/// One submitted download job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Short unique id, also the name of the job's download directory.
    pub id: String,
    /// Who submitted the job; doubles as the delivery recipient.
    pub identity: String,
    pub url: String,
    pub platform: Platform,
    pub state: JobState,
    /// Acquisition attempts consumed so far.
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    /// Global submission order, monotonically increasing.
    pub position: u64,
}

/// Broadcast on every job state change.
#[derive(Debug, Clone)]
pub struct JobEvent {
    pub job_id: String,
    pub state: JobState,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] PlatformError),

    #[error("unsupported platform: {0}. Supported: snapchat, instagram, tiktok, twitter, facebook")]
    UnsupportedPlatform(Platform),

    #[error("{identity} already has {limit} active jobs, wait for one to finish")]
    IdentityBusy { identity: String, limit: usize },

    #[error("unknown job: {0}")]
    UnknownJob(String),

    #[error("scheduler is shut down")]
    ShutDown,

    #[error("failed to prepare job workspace: {0}")]
    Workspace(#[from] std::io::Error),
}
