//! Mock chunked-upload session for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::delivery::{DeliveryError, LargeFileSession};

/// One chunked transfer as observed by the mock.
#[derive(Debug, Clone)]
pub struct RecordedTransfer {
    pub recipient: String,
    pub name: String,
    pub total_bytes: u64,
    /// Size of each chunk received, in order.
    pub chunks: Vec<usize>,
    pub committed: bool,
}

/// Mock implementation of the LargeFileSession trait.
///
/// Records every transfer and can simulate a dropped connection, either
/// once after a given number of chunks or on every transfer.
#[derive(Debug, Clone, Default)]
pub struct MockLargeFileSession {
    transfers: Arc<RwLock<Vec<RecordedTransfer>>>,
    drop_after_chunks: Arc<RwLock<Option<usize>>>,
    drop_every_transfer: Arc<RwLock<bool>>,
    reconnect_count: Arc<AtomicUsize>,
}

impl MockLargeFileSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// All transfers opened so far, including aborted ones.
    pub async fn transfers(&self) -> Vec<RecordedTransfer> {
        self.transfers.read().await.clone()
    }

    /// How many times the session was reconnected.
    pub fn reconnects(&self) -> usize {
        self.reconnect_count.load(Ordering::SeqCst)
    }

    /// Drop the connection once, after `n` chunks of the next transfer.
    pub async fn fail_after_chunks(&self, n: usize) {
        *self.drop_after_chunks.write().await = Some(n);
    }

    /// Drop the connection on the first chunk of every transfer.
    pub async fn fail_every_transfer(&self) {
        *self.drop_every_transfer.write().await = true;
    }
}

#[async_trait]
impl LargeFileSession for MockLargeFileSession {
    async fn reconnect(&self) -> Result<(), DeliveryError> {
        self.reconnect_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn begin(
        &self,
        recipient: &str,
        name: &str,
        size_bytes: u64,
    ) -> Result<(), DeliveryError> {
        self.transfers.write().await.push(RecordedTransfer {
            recipient: recipient.to_string(),
            name: name.to_string(),
            total_bytes: size_bytes,
            chunks: Vec::new(),
            committed: false,
        });
        Ok(())
    }

    async fn send_chunk(&self, data: &[u8]) -> Result<(), DeliveryError> {
        if *self.drop_every_transfer.read().await {
            return Err(DeliveryError::ConnectionDropped(
                "simulated persistent drop".to_string(),
            ));
        }

        let chunk_count = {
            let mut transfers = self.transfers.write().await;
            let current = transfers
                .last_mut()
                .ok_or_else(|| DeliveryError::Session("chunk before begin".to_string()))?;
            current.chunks.push(data.len());
            current.chunks.len()
        };

        let mut drop_after = self.drop_after_chunks.write().await;
        if drop_after.is_some_and(|n| chunk_count >= n) {
            drop_after.take();
            return Err(DeliveryError::ConnectionDropped(
                "simulated drop".to_string(),
            ));
        }
        Ok(())
    }

    async fn commit(&self) -> Result<(), DeliveryError> {
        let mut transfers = self.transfers.write().await;
        let current = transfers
            .last_mut()
            .ok_or_else(|| DeliveryError::Session("commit before begin".to_string()))?;
        current.committed = true;
        Ok(())
    }
}
