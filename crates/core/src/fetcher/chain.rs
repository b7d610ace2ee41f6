//! Strategy selection and fallback chaining.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::warn;

use super::api::StoryApiClient;
use super::error::FetchError;
use super::tool::{ToolFetcher, ToolKind};
use super::types::{AcquisitionResult, FetchRequest};
use crate::credentials::CredentialStore;
use crate::platform::Platform;
use crate::retry::{retry_with_backoff, BackoffPolicy};

/// The closed set of acquisition strategies.
///
/// All variants satisfy the same contract: one attempt against the request,
/// materializing artifacts into the job directory. Selection and fallback
/// are explicit rules, never runtime type inspection.
pub enum Strategy {
    /// Native API client for the platform with a dedicated endpoint.
    StoryApi(StoryApiClient),
    /// Primary external tool (gallery-dl).
    PrimaryTool(ToolFetcher),
    /// Fallback external tool (yt-dlp), consulted only on ToolError.
    FallbackTool(ToolFetcher),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::StoryApi(_) => "story-api",
            Strategy::PrimaryTool(t) | Strategy::FallbackTool(t) => t.kind().name(),
        }
    }

    pub async fn attempt(
        &self,
        request: &FetchRequest,
        credential: Option<&Path>,
    ) -> Result<AcquisitionResult, FetchError> {
        match self {
            Strategy::StoryApi(client) => client.attempt(request).await,
            Strategy::PrimaryTool(tool) | Strategy::FallbackTool(tool) => {
                tool.attempt(request, credential).await
            }
        }
    }
}

/// Run `primary` under the retry policy, then give `fallback` its single
/// attempt, but only if the final error is a ToolError.
///
/// Transient errors are retried on the same strategy and never switch tools;
/// AuthRequired and NotFound surface immediately. When both tools fail, the
/// returned error carries both failure details.
pub async fn run_chain(
    policy: &BackoffPolicy,
    primary: &Strategy,
    fallback: Option<&Strategy>,
    request: &FetchRequest,
    credential: Option<&Path>,
) -> Result<AcquisitionResult, FetchError> {
    let attempts = AtomicU32::new(0);

    let primary_result = retry_with_backoff(policy, |attempt| {
        attempts.store(attempt, Ordering::SeqCst);
        async move { primary.attempt(request, credential).await }
    })
    .await;

    let attempts_used = attempts.load(Ordering::SeqCst);

    match primary_result {
        Ok(mut result) => {
            result.attempts = attempts_used;
            Ok(result)
        }
        Err(primary_err) if primary_err.fallback_eligible() => {
            let Some(fallback) = fallback else {
                return Err(primary_err);
            };
            warn!(
                primary = primary.name(),
                fallback = fallback.name(),
                "primary tool failed, trying fallback: {}",
                primary_err
            );
            crate::metrics::FALLBACK_INVOCATIONS.inc();

            match fallback.attempt(request, credential).await {
                Ok(mut result) => {
                    result.attempts = attempts_used + 1;
                    Ok(result)
                }
                Err(fallback_err) => Err(FetchError::ToolChainFailed {
                    primary: primary_err.to_string(),
                    fallback: fallback_err.to_string(),
                }),
            }
        }
        Err(e) => Err(e),
    }
}

/// The acquisition seam the scheduler depends on.
#[async_trait]
pub trait Acquirer: Send + Sync {
    async fn acquire(&self, request: &FetchRequest) -> Result<AcquisitionResult, FetchError>;
}

/// Production [`Acquirer`]: routes a request to the right strategy for its
/// platform and consults the credential store for the job's identity.
pub struct PlatformAcquirer {
    policy: BackoffPolicy,
    credentials: Arc<CredentialStore>,
    story_api: Strategy,
    primary_tool: Strategy,
    fallback_tool: Strategy,
}

impl PlatformAcquirer {
    pub fn new(
        policy: BackoffPolicy,
        credentials: Arc<CredentialStore>,
        story_api: StoryApiClient,
        primary_tool: ToolFetcher,
        fallback_tool: ToolFetcher,
    ) -> Self {
        Self {
            policy,
            credentials,
            story_api: Strategy::StoryApi(story_api),
            primary_tool: Strategy::PrimaryTool(primary_tool),
            fallback_tool: Strategy::FallbackTool(fallback_tool),
        }
    }

    /// Build the full production chain from configuration.
    pub fn from_config(
        config: &crate::config::Config,
        credentials: Arc<CredentialStore>,
    ) -> Result<Self, FetchError> {
        let tool_timeout = std::time::Duration::from_secs(config.tools.tool_timeout_secs);
        Ok(Self::new(
            config.retry.policy(),
            credentials,
            StoryApiClient::new(&config.story_api)?,
            ToolFetcher::new(ToolKind::GalleryDl, &config.tools.gallery_dl_path, tool_timeout),
            ToolFetcher::new(ToolKind::YtDlp, &config.tools.yt_dlp_path, tool_timeout),
        ))
    }

    /// Strategy routing per platform. Snapchat has a native API and no
    /// fallback; every other supported platform runs the tool chain.
    fn route(&self, platform: Platform) -> Result<(&Strategy, Option<&Strategy>), FetchError> {
        match platform {
            Platform::Snapchat => Ok((&self.story_api, None)),
            Platform::Instagram | Platform::TikTok | Platform::Twitter | Platform::Facebook => {
                Ok((&self.primary_tool, Some(&self.fallback_tool)))
            }
            Platform::Unknown => Err(FetchError::UnsupportedPlatform(platform)),
        }
    }
}

#[async_trait]
impl Acquirer for PlatformAcquirer {
    async fn acquire(&self, request: &FetchRequest) -> Result<AcquisitionResult, FetchError> {
        let (primary, fallback) = self.route(request.platform)?;
        let credential = self
            .credentials
            .lookup(&request.identity, request.platform)
            .await;

        run_chain(
            &self.policy,
            primary,
            fallback,
            request,
            credential.as_deref(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tokio::time::Duration;

    /// Write an executable script so a real subprocess drives the chain.
    fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn request(job_dir: &Path) -> FetchRequest {
        FetchRequest {
            url: "https://tiktok.com/@user/video/1".to_string(),
            platform: Platform::TikTok,
            identity: "42".to_string(),
            job_dir: job_dir.to_path_buf(),
        }
    }

    fn fast_policy() -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: 3,
            initial_wait: Duration::from_millis(1),
            max_wait: Duration::from_millis(2),
        }
    }

    fn tool_strategy(kind: ToolKind, program: &Path) -> Strategy {
        let fetcher = ToolFetcher::new(kind, program, Duration::from_secs(10));
        match kind {
            ToolKind::GalleryDl => Strategy::PrimaryTool(fetcher),
            ToolKind::YtDlp => Strategy::FallbackTool(fetcher),
        }
    }

    #[tokio::test]
    async fn test_tool_error_triggers_exactly_one_fallback() {
        let tools = TempDir::new().unwrap();
        let jobs = TempDir::new().unwrap();

        let primary_marker = tools.path().join("primary_runs");
        let primary = fake_tool(
            tools.path(),
            "gallery-dl",
            &format!(
                "echo run >> {}\necho 'extractor failure' >&2\nexit 1",
                primary_marker.display()
            ),
        );
        // Fallback succeeds and drops a file into the job dir.
        let fallback = fake_tool(
            tools.path(),
            "yt-dlp",
            &format!("echo data > {}/clip.mp4\nexit 0", jobs.path().display()),
        );

        let primary = tool_strategy(ToolKind::GalleryDl, &primary);
        let fallback = tool_strategy(ToolKind::YtDlp, &fallback);

        let result = run_chain(&fast_policy(), &primary, Some(&fallback), &request(jobs.path()), None)
            .await
            .unwrap();

        assert_eq!(result.tool, "yt-dlp");
        assert_eq!(result.artifacts.len(), 1);
        // ToolError is permanent for the retry engine: one primary run only.
        let runs = std::fs::read_to_string(&primary_marker).unwrap();
        assert_eq!(runs.lines().count(), 1);
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test]
    async fn test_auth_required_never_falls_back() {
        let tools = TempDir::new().unwrap();
        let jobs = TempDir::new().unwrap();

        let primary = fake_tool(
            tools.path(),
            "gallery-dl",
            "echo 'login required' >&2\nexit 1",
        );
        let fallback_marker = tools.path().join("fallback_ran");
        let fallback = fake_tool(
            tools.path(),
            "yt-dlp",
            &format!("touch {}\nexit 0", fallback_marker.display()),
        );

        let primary = tool_strategy(ToolKind::GalleryDl, &primary);
        let fallback = tool_strategy(ToolKind::YtDlp, &fallback);

        let err = run_chain(&fast_policy(), &primary, Some(&fallback), &request(jobs.path()), None)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::AuthRequired { .. }));
        assert!(!fallback_marker.exists());
    }

    #[tokio::test]
    async fn test_transient_retries_same_tool_without_fallback() {
        let tools = TempDir::new().unwrap();
        let jobs = TempDir::new().unwrap();

        let primary_marker = tools.path().join("primary_runs");
        let primary = fake_tool(
            tools.path(),
            "gallery-dl",
            &format!(
                "echo run >> {}\necho 'connection reset' >&2\nexit 1",
                primary_marker.display()
            ),
        );
        let fallback_marker = tools.path().join("fallback_ran");
        let fallback = fake_tool(
            tools.path(),
            "yt-dlp",
            &format!("touch {}\nexit 0", fallback_marker.display()),
        );

        let primary = tool_strategy(ToolKind::GalleryDl, &primary);
        let fallback = tool_strategy(ToolKind::YtDlp, &fallback);

        let err = run_chain(&fast_policy(), &primary, Some(&fallback), &request(jobs.path()), None)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Transient { .. }));
        // Retried to exhaustion on the same tool.
        let runs = std::fs::read_to_string(&primary_marker).unwrap();
        assert_eq!(runs.lines().count(), 3);
        assert!(!fallback_marker.exists());
    }

    #[tokio::test]
    async fn test_both_tools_failing_reports_both_details() {
        let tools = TempDir::new().unwrap();
        let jobs = TempDir::new().unwrap();

        let primary = fake_tool(
            tools.path(),
            "gallery-dl",
            "echo 'extractor failure alpha' >&2\nexit 1",
        );
        let fallback = fake_tool(
            tools.path(),
            "yt-dlp",
            "echo 'format error beta' >&2\nexit 1",
        );

        let primary = tool_strategy(ToolKind::GalleryDl, &primary);
        let fallback = tool_strategy(ToolKind::YtDlp, &fallback);

        let err = run_chain(&fast_policy(), &primary, Some(&fallback), &request(jobs.path()), None)
            .await
            .unwrap_err();

        match err {
            FetchError::ToolChainFailed { primary, fallback } => {
                assert!(primary.contains("alpha"), "{}", primary);
                assert!(fallback.contains("beta"), "{}", fallback);
            }
            other => panic!("expected ToolChainFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_platform_is_rejected() {
        let dir = TempDir::new().unwrap();
        let credentials = Arc::new(CredentialStore::open(dir.path()).await.unwrap());
        let acquirer = PlatformAcquirer::new(
            fast_policy(),
            credentials,
            StoryApiClient::new(&crate::fetcher::StoryApiConfig::default()).unwrap(),
            ToolFetcher::with_defaults(ToolKind::GalleryDl),
            ToolFetcher::with_defaults(ToolKind::YtDlp),
        );

        let mut req = request(dir.path());
        req.platform = Platform::Unknown;
        let err = acquirer.acquire(&req).await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedPlatform(_)));
    }
}
