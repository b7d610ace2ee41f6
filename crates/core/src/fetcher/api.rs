//! Native story API client for the platform that has a dedicated endpoint.

use futures::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::time::Duration;
use tracing::{info, warn};

use super::error::FetchError;
use super::types::{AcquisitionResult, Artifact, FetchRequest};
use crate::platform;

/// Client configuration for the story API.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct StoryApiConfig {
    /// Base URL of the story listing endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-call network timeout.
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
    /// Optional bearer token sent with every API call.
    #[serde(default)]
    pub api_token: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

impl Default for StoryApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_api_timeout(),
            api_token: None,
        }
    }
}

/// Story listing response.
#[derive(Debug, Deserialize)]
struct StoryListResponse {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    count: Option<u32>,
    #[serde(default)]
    data: Vec<StoryItem>,
}

#[derive(Debug, Deserialize)]
struct StoryItem {
    #[serde(rename = "mediaUrl")]
    media_url: Option<String>,
    /// 0 = image, 1 = video.
    #[serde(rename = "mediaType", default)]
    media_type: u8,
    #[serde(default)]
    timestamp: Option<String>,
}

impl StoryItem {
    fn extension(&self) -> &'static str {
        if self.media_type == 1 {
            "mp4"
        } else {
            "jpg"
        }
    }
}

/// Acquisition strategy backed by a remote story API.
///
/// Lists active stories for a username, then streams each media reference
/// into the job directory one bounded chunk at a time.
pub struct StoryApiClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl StoryApiClient {
    pub fn new(config: &StoryApiConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("clipflow/0.1")
            .build()
            .map_err(|e| FetchError::Api {
                detail: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    pub async fn attempt(&self, request: &FetchRequest) -> Result<AcquisitionResult, FetchError> {
        let username = platform::snapchat_username(&request.url).ok_or_else(|| {
            FetchError::InvalidInput(format!(
                "could not extract a username from {}",
                request.url
            ))
        })?;

        info!(username, "fetching story list");
        let listing = self.fetch_stories(&username).await?;

        if !listing.status {
            let detail = listing
                .message
                .unwrap_or_else(|| "unknown API error".to_string());
            if detail.to_lowercase().contains("not found") {
                return Err(FetchError::NotFound { detail });
            }
            return Err(FetchError::Api { detail });
        }

        if listing.data.is_empty() {
            return Err(FetchError::NoContent);
        }

        tokio::fs::create_dir_all(&request.job_dir).await?;

        let total = listing.count.unwrap_or(listing.data.len() as u32);
        let mut artifacts = Vec::new();

        for (index, story) in listing.data.iter().enumerate() {
            let Some(media_url) = story.media_url.as_deref() else {
                warn!(index, "story has no media URL, skipping");
                continue;
            };

            let stamp = story
                .timestamp
                .clone()
                .unwrap_or_else(|| chrono::Utc::now().timestamp().to_string());
            let filename = format!(
                "snapchat_{}_{}_{}.{}",
                username,
                stamp,
                index + 1,
                story.extension()
            );
            let dest = request.job_dir.join(filename);

            let size_bytes = self.download_media(media_url, &dest).await?;
            info!(file = %dest.display(), index = index + 1, total, "story downloaded");
            artifacts.push(Artifact {
                path: dest,
                size_bytes,
            });
        }

        if artifacts.is_empty() {
            return Err(FetchError::NoContent);
        }

        Ok(AcquisitionResult {
            artifacts,
            tool: "story-api".to_string(),
            attempts: 1,
        })
    }

    async fn fetch_stories(&self, username: &str) -> Result<StoryListResponse, FetchError> {
        let endpoint = format!("{}/story", self.base_url);
        let mut builder = self
            .http
            .post(&endpoint)
            .json(&serde_json::json!({ "username": username }));
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await.map_err(FetchError::from_http)?;

        // The API answers descriptive JSON even on 4xx; prefer its message
        // over the bare status code when the body parses.
        let status = response.status();
        match response.json::<StoryListResponse>().await {
            Ok(listing) => Ok(listing),
            Err(_) if status.is_server_error() => Err(FetchError::Transient {
                detail: format!("HTTP {}", status),
            }),
            Err(_) => Err(FetchError::Api {
                detail: format!("HTTP {}: unparseable response", status),
            }),
        }
    }

    /// Stream one media reference to disk; returns the byte size.
    async fn download_media(
        &self,
        media_url: &str,
        dest: &std::path::Path,
    ) -> Result<u64, FetchError> {
        let response = self
            .http
            .get(media_url)
            .send()
            .await
            .map_err(FetchError::from_http)?
            .error_for_status()
            .map_err(FetchError::from_http)?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(FetchError::from_http)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}
