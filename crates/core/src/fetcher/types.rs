//! Acquisition request/result types.

use std::path::PathBuf;

use crate::platform::Platform;

/// What a strategy is asked to fetch, and where to put it.
///
/// `job_dir` is exclusively owned by the job for its whole lifetime; every
/// strategy materializes artifacts inside it and nowhere else.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub platform: Platform,
    pub identity: String,
    pub job_dir: PathBuf,
}

/// One locally materialized media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Successful outcome of one acquisition.
///
/// A single request may yield several artifacts (a story reel is many
/// files); each flows through delivery and cleanup on its own.
#[derive(Debug, Clone)]
pub struct AcquisitionResult {
    pub artifacts: Vec<Artifact>,
    /// Which strategy produced the artifacts ("story-api", "gallery-dl", "yt-dlp").
    pub tool: String,
    /// Attempts consumed, including the successful one.
    pub attempts: u32,
}

impl AcquisitionResult {
    pub fn total_bytes(&self) -> u64 {
        self.artifacts.iter().map(|a| a.size_bytes).sum()
    }
}
