use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::delivery::DeliveryConfig;
use crate::fetcher::StoryApiConfig;
use crate::retry::BackoffPolicy;
use crate::scheduler::SchedulerConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub limiter: LimiterConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub story_api: StoryApiConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Sliding-window rate limiter configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimiterConfig {
    /// Requests admitted per scope within one window.
    #[serde(default = "default_max_requests")]
    pub max_requests_per_window: usize,
    /// Window length in seconds.
    #[serde(default = "default_window")]
    pub window_seconds: u64,
}

impl LimiterConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: default_max_requests(),
            window_seconds: default_window(),
        }
    }
}

fn default_max_requests() -> usize {
    10
}

fn default_window() -> u64 {
    60
}

/// Retry/backoff configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_wait")]
    pub initial_wait_secs: u64,
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
}

impl RetryConfig {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: self.max_attempts,
            initial_wait: Duration::from_secs(self.initial_wait_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_wait_secs: default_initial_wait(),
            max_wait_secs: default_max_wait(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_wait() -> u64 {
    2
}

fn default_max_wait() -> u64 {
    60
}

/// On-disk layout and retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root under which per-job directories are created.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Where credential files are kept.
    #[serde(default = "default_credential_dir")]
    pub credential_dir: PathBuf,
    /// Untracked entries older than this are swept.
    #[serde(default = "default_stale_secs")]
    pub stale_artifact_secs: u64,
    /// How often the sweep runs.
    #[serde(default = "default_sweep_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            credential_dir: default_credential_dir(),
            stale_artifact_secs: default_stale_secs(),
            sweep_interval_secs: default_sweep_secs(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_credential_dir() -> PathBuf {
    PathBuf::from("credentials")
}

fn default_stale_secs() -> u64 {
    86_400 // 1 day
}

fn default_sweep_secs() -> u64 {
    3_600
}

/// External downloader tool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Primary tool binary (name on PATH or absolute path).
    #[serde(default = "default_gallery_dl")]
    pub gallery_dl_path: PathBuf,
    /// Fallback tool binary.
    #[serde(default = "default_yt_dlp")]
    pub yt_dlp_path: PathBuf,
    /// Per-invocation wall clock in seconds.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            gallery_dl_path: default_gallery_dl(),
            yt_dlp_path: default_yt_dlp(),
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}

fn default_gallery_dl() -> PathBuf {
    PathBuf::from("gallery-dl")
}

fn default_yt_dlp() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_tool_timeout() -> u64 {
    300
}

/// Sanitized config for logging and status surfaces (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub limiter: LimiterConfig,
    pub retry: RetryConfig,
    pub scheduler: SchedulerConfig,
    pub delivery: DeliveryConfig,
    pub storage: StorageConfig,
    pub story_api: SanitizedStoryApiConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStoryApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl Config {
    /// A copy safe to log or expose: the story API token is redacted.
    pub fn sanitized(&self) -> SanitizedConfig {
        SanitizedConfig {
            limiter: self.limiter.clone(),
            retry: self.retry.clone(),
            scheduler: self.scheduler.clone(),
            delivery: self.delivery.clone(),
            storage: self.storage.clone(),
            story_api: SanitizedStoryApiConfig {
                base_url: self.story_api.base_url.clone(),
                timeout_secs: self.story_api.timeout_secs,
                api_token: self.story_api.api_token.as_ref().map(|_| "***".to_string()),
            },
            tools: self.tools.clone(),
        }
    }
}
