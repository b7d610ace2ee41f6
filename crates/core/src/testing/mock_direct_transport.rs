//! Mock direct transport for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::delivery::{DeliveryError, DirectTransport};

/// A recorded direct send for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub recipient: String,
    pub path: PathBuf,
    pub caption: String,
}

/// Mock implementation of the DirectTransport trait.
///
/// Records every delivered file and can be primed to fail the next send.
#[derive(Debug, Clone, Default)]
pub struct MockDirectTransport {
    sends: Arc<RwLock<Vec<RecordedSend>>>,
    next_error: Arc<RwLock<Option<String>>>,
}

impl MockDirectTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files delivered so far, in order.
    pub async fn sent_files(&self) -> Vec<RecordedSend> {
        self.sends.read().await.clone()
    }

    /// Make the next send fail with a transport error.
    pub async fn fail_next(&self, detail: &str) {
        *self.next_error.write().await = Some(detail.to_string());
    }
}

#[async_trait]
impl DirectTransport for MockDirectTransport {
    async fn send_file(
        &self,
        recipient: &str,
        path: &Path,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        if let Some(detail) = self.next_error.write().await.take() {
            return Err(DeliveryError::Transport(detail));
        }
        self.sends.write().await.push(RecordedSend {
            recipient: recipient.to_string(),
            path: path.to_path_buf(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}
