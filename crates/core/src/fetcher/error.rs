//! Acquisition error taxonomy.

use thiserror::Error;

use crate::platform::Platform;
use crate::retry::{ErrorClass, Retryable};

/// Failure of one acquisition attempt or of a whole strategy chain.
///
/// The variant decides everything downstream: whether the retry engine tries
/// again, whether the fallback tool is consulted, and what remediation hint
/// the user sees.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Malformed or unusable request input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The URL belongs to no supported platform.
    #[error("Unsupported platform: {0}. Supported: snapchat, instagram, tiktok, twitter, facebook")]
    UnsupportedPlatform(Platform),

    /// The platform rejected the request for lack of authentication.
    #[error("Authentication required: {detail}. Upload a cookies.txt credential and retry")]
    AuthRequired { detail: String },

    /// Content is gone, private, or never existed.
    #[error("Content not found: {detail}")]
    NotFound { detail: String },

    /// The tool or API succeeded but produced no files.
    #[error("No content available")]
    NoContent,

    /// Timeout, connection failure, 5xx, or explicit rate-limit signal.
    /// The only retryable variant.
    #[error("Transient failure: {detail}")]
    Transient { detail: String },

    /// Non-auth, non-transient tool failure. Eligible for one fallback
    /// attempt on the other tool.
    #[error("{tool} failed: {detail}")]
    ToolError { tool: String, detail: String },

    /// Both tools of the chain failed; carries both failure details.
    #[error("Download failed. Primary: {primary}. Fallback: {fallback}")]
    ToolChainFailed { primary: String, fallback: String },

    /// The attempt exceeded its wall-clock limit and was killed.
    #[error("Attempt timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The remote API answered with a terminal error.
    #[error("API error: {detail}")]
    Api { detail: String },

    /// Local filesystem failure while materializing an artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Map an HTTP client failure onto the taxonomy.
    pub fn from_http(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            return FetchError::Transient { detail: e.to_string() };
        }
        if let Some(status) = e.status() {
            if status.is_server_error() || status.as_u16() == 429 {
                return FetchError::Transient {
                    detail: format!("HTTP {}", status),
                };
            }
            if status.as_u16() == 404 {
                return FetchError::NotFound {
                    detail: format!("HTTP {}", status),
                };
            }
            return FetchError::Api {
                detail: format!("HTTP {}", status),
            };
        }
        FetchError::Transient { detail: e.to_string() }
    }

    /// Whether the fallback tool should get its single attempt.
    pub fn fallback_eligible(&self) -> bool {
        matches!(self, FetchError::ToolError { .. })
    }
}

impl Retryable for FetchError {
    fn error_class(&self) -> ErrorClass {
        match self {
            FetchError::Transient { .. } | FetchError::Io(_) => ErrorClass::Transient,
            _ => ErrorClass::Permanent,
        }
    }
}
