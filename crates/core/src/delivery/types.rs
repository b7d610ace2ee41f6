//! Delivery configuration and progress types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which of the two mutually exclusive paths shipped an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPath {
    Direct,
    Chunked,
}

/// Path selection thresholds and chunk sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Artifacts at or above this size take the chunked path.
    #[serde(default = "default_size_threshold")]
    pub size_threshold_bytes: u64,

    /// Hard upper bound for any artifact.
    #[serde(default = "default_max_size")]
    pub max_size_bytes: u64,

    /// Buffer size for the chunked path; at most one chunk is ever
    /// held in memory per transfer.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: usize,
}

fn default_size_threshold() -> u64 {
    50 * 1024 * 1024 // 50 MiB, the direct channel's per-file cap
}

fn default_max_size() -> u64 {
    2 * 1024 * 1024 * 1024 // 2 GiB, the session's per-file cap
}

fn default_chunk_size() -> usize {
    512 * 1024
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            size_threshold_bytes: default_size_threshold(),
            max_size_bytes: default_max_size(),
            chunk_size_bytes: default_chunk_size(),
        }
    }
}

/// Progress of one artifact transfer.
///
/// `percent` is monotonically non-decreasing for the lifetime of the
/// transfer, including across a reconnect-and-restart.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryProgress {
    pub artifact: PathBuf,
    pub transferred_bytes: u64,
    pub total_bytes: u64,
    pub percent: f32,
}
