//! External tool adapters (gallery-dl and yt-dlp subprocesses).
//!
//! Tools are always invoked as argv arrays, never through a shell. Artifacts
//! are discovered by diffing the job directory before and after the run,
//! since neither tool reports output paths reliably.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::error::FetchError;
use super::types::{AcquisitionResult, Artifact, FetchRequest};

/// Which external tool this adapter drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    GalleryDl,
    YtDlp,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::GalleryDl => "gallery-dl",
            ToolKind::YtDlp => "yt-dlp",
        }
    }
}

/// Subprocess-based acquisition adapter.
#[derive(Debug, Clone)]
pub struct ToolFetcher {
    kind: ToolKind,
    /// Program to exec; defaults to the tool name resolved via PATH.
    program: PathBuf,
    timeout: Duration,
}

impl ToolFetcher {
    pub fn new(kind: ToolKind, program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            kind,
            program: program.into(),
            timeout,
        }
    }

    pub fn with_defaults(kind: ToolKind) -> Self {
        Self::new(kind, kind.name(), Duration::from_secs(300))
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    /// Argv tail (everything after the program name) for one request.
    fn build_args(&self, request: &FetchRequest, credential: Option<&Path>) -> Vec<String> {
        let mut args = match self.kind {
            ToolKind::GalleryDl => vec![
                "-d".to_string(),
                request.job_dir.to_string_lossy().to_string(),
                "--no-mtime".to_string(),
            ],
            ToolKind::YtDlp => vec![
                "-o".to_string(),
                request
                    .job_dir
                    .join("%(id)s.%(ext)s")
                    .to_string_lossy()
                    .to_string(),
                "--no-warnings".to_string(),
                "--no-playlist".to_string(),
            ],
        };

        if let Some(cookie_file) = credential {
            debug!(tool = self.kind.name(), "using credential file");
            args.push("--cookies".to_string());
            args.push(cookie_file.to_string_lossy().to_string());
        }

        args.push(request.url.clone());
        args
    }

    /// Run the tool once. Retrying is the caller's concern.
    pub async fn attempt(
        &self,
        request: &FetchRequest,
        credential: Option<&Path>,
    ) -> Result<AcquisitionResult, FetchError> {
        tokio::fs::create_dir_all(&request.job_dir).await?;
        let before = snapshot_files(&request.job_dir).await?;

        let args = self.build_args(request, credential);
        info!(
            tool = self.kind.name(),
            platform = %request.platform,
            "running acquisition tool"
        );

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FetchError::ToolError {
                        tool: self.kind.name().to_string(),
                        detail: format!("{} is not installed", self.program.display()),
                    }
                } else {
                    FetchError::Io(e)
                }
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                // kill_on_drop reaps the child when the future is dropped.
                return Err(FetchError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                tool = self.kind.name(),
                code = output.status.code(),
                "tool exited with failure"
            );
            return Err(classify_tool_failure(self.kind.name(), &stderr));
        }

        let after = snapshot_files(&request.job_dir).await?;
        let artifacts = collect_new_artifacts(&before, after).await?;

        if artifacts.is_empty() {
            return Err(FetchError::NoContent);
        }

        info!(
            tool = self.kind.name(),
            files = artifacts.len(),
            "acquisition complete"
        );

        Ok(AcquisitionResult {
            artifacts,
            tool: self.kind.name().to_string(),
            attempts: 1,
        })
    }
}

/// Map a tool's stderr text onto the error taxonomy.
pub fn classify_tool_failure(tool: &str, stderr: &str) -> FetchError {
    let lower = stderr.to_lowercase();

    if lower.contains("login") || lower.contains("authentication") {
        return FetchError::AuthRequired {
            detail: trimmed(stderr),
        };
    }

    if lower.contains("404") || lower.contains("not found") {
        return FetchError::NotFound {
            detail: trimmed(stderr),
        };
    }

    const TRANSIENT_MARKERS: [&str; 6] = [
        "timeout",
        "connection",
        "network",
        "temporary",
        "rate limit",
        "try again",
    ];
    if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        return FetchError::Transient {
            detail: trimmed(stderr),
        };
    }

    FetchError::ToolError {
        tool: tool.to_string(),
        detail: trimmed(stderr),
    }
}

fn trimmed(stderr: &str) -> String {
    let text = stderr.trim();
    if text.is_empty() {
        return "no error output".to_string();
    }
    // Keep failure text short enough to relay to the requester.
    text.chars().take(300).collect()
}

/// All regular files under `dir`, hidden files excluded.
async fn snapshot_files(dir: &Path) -> Result<HashSet<PathBuf>, FetchError> {
    let mut files = HashSet::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if hidden {
                continue;
            }

            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                files.insert(path);
            }
        }
    }

    Ok(files)
}

async fn collect_new_artifacts(
    before: &HashSet<PathBuf>,
    after: HashSet<PathBuf>,
) -> Result<Vec<Artifact>, FetchError> {
    let mut artifacts = Vec::new();
    for path in after {
        if before.contains(&path) {
            continue;
        }
        let meta = tokio::fs::metadata(&path).await?;
        artifacts.push(Artifact {
            path,
            size_bytes: meta.len(),
        });
    }
    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use tempfile::TempDir;

    fn request(job_dir: &Path) -> FetchRequest {
        FetchRequest {
            url: "https://instagram.com/p/abc".to_string(),
            platform: Platform::Instagram,
            identity: "42".to_string(),
            job_dir: job_dir.to_path_buf(),
        }
    }

    #[test]
    fn test_gallery_dl_args() {
        let dir = TempDir::new().unwrap();
        let fetcher = ToolFetcher::with_defaults(ToolKind::GalleryDl);
        let args = fetcher.build_args(&request(dir.path()), None);

        assert_eq!(args[0], "-d");
        assert_eq!(args[1], dir.path().to_string_lossy());
        assert_eq!(args[2], "--no-mtime");
        assert_eq!(args.last().unwrap(), "https://instagram.com/p/abc");
        assert!(!args.contains(&"--cookies".to_string()));
    }

    #[test]
    fn test_yt_dlp_args_with_credential() {
        let dir = TempDir::new().unwrap();
        let fetcher = ToolFetcher::with_defaults(ToolKind::YtDlp);
        let cookie = dir.path().join("instagram_42.txt");
        let args = fetcher.build_args(&request(dir.path()), Some(&cookie));

        assert_eq!(args[0], "-o");
        assert!(args[1].ends_with("%(id)s.%(ext)s"));
        assert!(args.contains(&"--no-playlist".to_string()));
        let cookie_idx = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[cookie_idx + 1], cookie.to_string_lossy());
        assert_eq!(args.last().unwrap(), "https://instagram.com/p/abc");
    }

    #[test]
    fn test_classify_auth_failure() {
        let err = classify_tool_failure("gallery-dl", "error: login required for this profile");
        assert!(matches!(err, FetchError::AuthRequired { .. }));
    }

    #[test]
    fn test_classify_not_found() {
        let err = classify_tool_failure("gallery-dl", "HTTP 404: post not found");
        assert!(matches!(err, FetchError::NotFound { .. }));
    }

    #[test]
    fn test_classify_transient() {
        for stderr in ["connection reset by peer", "read timeout", "rate limit exceeded"] {
            let err = classify_tool_failure("yt-dlp", stderr);
            assert!(matches!(err, FetchError::Transient { .. }), "{}", stderr);
        }
    }

    #[test]
    fn test_classify_default_tool_error() {
        let err = classify_tool_failure("gallery-dl", "extractor failure: unsupported format");
        match err {
            FetchError::ToolError { tool, detail } => {
                assert_eq!(tool, "gallery-dl");
                assert!(detail.contains("extractor failure"));
            }
            other => panic!("expected ToolError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_error() {
        let dir = TempDir::new().unwrap();
        let fetcher = ToolFetcher::new(
            ToolKind::GalleryDl,
            "/nonexistent/gallery-dl",
            Duration::from_secs(5),
        );
        let err = fetcher.attempt(&request(dir.path()), None).await.unwrap_err();
        assert!(matches!(err, FetchError::ToolError { .. }));
    }

    #[tokio::test]
    async fn test_tool_success_without_new_files_is_no_content() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("old.mp4"), b"pre-existing").unwrap();

        // `true` ignores its argv and exits 0 without producing files.
        let fetcher = ToolFetcher::new(ToolKind::GalleryDl, "true", Duration::from_secs(5));
        let err = fetcher.attempt(&request(dir.path()), None).await.unwrap_err();
        assert!(matches!(err, FetchError::NoContent));
    }

    #[tokio::test]
    async fn test_snapshot_ignores_hidden_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".hidden"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/clip.mp4"), b"data").unwrap();

        let files = snapshot_files(dir.path()).await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.contains(&dir.path().join("sub/clip.mp4")));
    }
}
