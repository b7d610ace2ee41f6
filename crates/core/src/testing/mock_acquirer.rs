//! Mock acquirer for testing the scheduler end to end.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::fetcher::{Acquirer, AcquisitionResult, Artifact, FetchError, FetchRequest};

/// Mock implementation of the Acquirer trait.
///
/// By default every call succeeds: a small artifact is materialized inside
/// the request's job directory, so downstream delivery and cleanup operate
/// on real files. Calls can be scripted with a queue of outcomes and slowed
/// down to exercise concurrency limits and timeouts.
#[derive(Debug, Clone, Default)]
pub struct MockAcquirer {
    requests: Arc<RwLock<Vec<FetchRequest>>>,
    scripted: Arc<RwLock<VecDeque<Result<AcquisitionResult, FetchError>>>>,
    delay_ms: Arc<RwLock<u64>>,
    artifact_bytes: Arc<RwLock<usize>>,
}

impl MockAcquirer {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(Vec::new())),
            scripted: Arc::new(RwLock::new(VecDeque::new())),
            delay_ms: Arc::new(RwLock::new(0)),
            artifact_bytes: Arc::new(RwLock::new(1024)),
        }
    }

    /// Requests received so far, in call order.
    pub async fn recorded_requests(&self) -> Vec<FetchRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Queue an outcome for a future call. Scripted outcomes are consumed
    /// in FIFO order before the default behavior applies.
    pub async fn push_outcome(&self, outcome: Result<AcquisitionResult, FetchError>) {
        self.scripted.write().await.push_back(outcome);
    }

    /// Shorthand for scripting a failure.
    pub async fn push_error(&self, error: FetchError) {
        self.push_outcome(Err(error)).await;
    }

    /// Simulated acquisition duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay_ms.write().await = delay.as_millis() as u64;
    }

    /// Size of the default artifact written on success.
    pub async fn set_artifact_bytes(&self, bytes: usize) {
        *self.artifact_bytes.write().await = bytes;
    }

    async fn default_success(&self, request: &FetchRequest) -> Result<AcquisitionResult, FetchError> {
        let bytes = *self.artifact_bytes.read().await;
        tokio::fs::create_dir_all(&request.job_dir).await?;
        let path = request.job_dir.join("clip.mp4");
        tokio::fs::write(&path, vec![0x2au8; bytes]).await?;
        Ok(AcquisitionResult {
            artifacts: vec![Artifact {
                path,
                size_bytes: bytes as u64,
            }],
            tool: "mock".to_string(),
            attempts: 1,
        })
    }
}

#[async_trait]
impl Acquirer for MockAcquirer {
    async fn acquire(&self, request: &FetchRequest) -> Result<AcquisitionResult, FetchError> {
        self.requests.write().await.push(request.clone());

        let delay_ms = *self.delay_ms.read().await;
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if let Some(outcome) = self.scripted.write().await.pop_front() {
            return outcome;
        }
        self.default_success(request).await
    }
}
