//! Delivery error types.

use thiserror::Error;

/// Failure while shipping an artifact back to the requester.
///
/// Delivery failures never imply acquisition failure: the artifact exists
/// and still goes through cleanup.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Artifact exceeds the chunked path's upper bound.
    #[error("Artifact too large: {size_bytes} bytes (limit {max_bytes})")]
    TooLarge { size_bytes: u64, max_bytes: u64 },

    /// The direct messaging channel rejected or dropped the file.
    #[error("Direct transport failed: {0}")]
    Transport(String),

    /// The long-lived session lost its connection mid-transfer.
    /// The router reconnects and restarts the transfer once.
    #[error("Session connection dropped: {0}")]
    ConnectionDropped(String),

    /// Non-connection session failure (auth revoked, protocol error).
    #[error("Session failed: {0}")]
    Session(String),

    /// Local read failure on the artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeliveryError {
    /// Whether a transparent reconnect-and-restart is worth attempting.
    pub fn is_connection_drop(&self) -> bool {
        matches!(self, DeliveryError::ConnectionDropped(_))
    }
}
