//! Boundary traits for the two delivery channels.
//!
//! The concrete channels (bot messaging API, authorized user session) live
//! outside this crate; the router only needs these contracts.

use async_trait::async_trait;
use std::path::Path;

use super::error::DeliveryError;

/// Primary messaging channel: takes a whole small file in one call.
#[async_trait]
pub trait DirectTransport: Send + Sync {
    async fn send_file(
        &self,
        recipient: &str,
        path: &Path,
        caption: &str,
    ) -> Result<(), DeliveryError>;
}

/// Long-lived, already-authenticated session for large files.
///
/// One transfer at a time: `begin` opens an upload, `send_chunk` appends
/// bounded chunks in order, `commit` finalizes. Implementations hold their
/// own connection state; the router serializes access and drives
/// reconnection through [`LargeFileSession::reconnect`].
#[async_trait]
pub trait LargeFileSession: Send + Sync {
    /// Re-establish the session after a dropped connection.
    async fn reconnect(&self) -> Result<(), DeliveryError>;

    /// Open an upload of `size_bytes` for `recipient`.
    async fn begin(
        &self,
        recipient: &str,
        name: &str,
        size_bytes: u64,
    ) -> Result<(), DeliveryError>;

    /// Append the next chunk of the open upload.
    async fn send_chunk(&self, data: &[u8]) -> Result<(), DeliveryError>;

    /// Finalize the open upload.
    async fn commit(&self) -> Result<(), DeliveryError>;
}
