//! Dual-path delivery router.

use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::error::DeliveryError;
use super::traits::{DirectTransport, LargeFileSession};
use super::types::{DeliveryConfig, DeliveryPath, DeliveryProgress};
use crate::fetcher::Artifact;

/// Routes each artifact to the direct or chunked path by byte size.
///
/// The chunked session is a shared singleton: the internal mutex serializes
/// transfers and guarantees a single reconnect attempt is in flight at a
/// time. Neither path holds more than one chunk in memory.
pub struct DeliveryRouter<D: DirectTransport, S: LargeFileSession> {
    config: DeliveryConfig,
    direct: Arc<D>,
    session: Arc<Mutex<S>>,
}

impl<D: DirectTransport, S: LargeFileSession> DeliveryRouter<D, S> {
    pub fn new(config: DeliveryConfig, direct: D, session: S) -> Self {
        Self {
            config,
            direct: Arc::new(direct),
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Ship one artifact to `recipient`.
    ///
    /// Progress events (chunked path only) are sent best-effort and never
    /// block the transfer.
    pub async fn deliver(
        &self,
        recipient: &str,
        artifact: &Artifact,
        progress_tx: Option<&mpsc::Sender<DeliveryProgress>>,
    ) -> Result<DeliveryPath, DeliveryError> {
        if artifact.size_bytes > self.config.max_size_bytes {
            return Err(DeliveryError::TooLarge {
                size_bytes: artifact.size_bytes,
                max_bytes: self.config.max_size_bytes,
            });
        }

        if artifact.size_bytes < self.config.size_threshold_bytes {
            debug!(file = %artifact.path.display(), "delivering via direct path");
            let caption = file_name(&artifact.path);
            self.direct
                .send_file(recipient, &artifact.path, &caption)
                .await?;
            return Ok(DeliveryPath::Direct);
        }

        info!(
            file = %artifact.path.display(),
            size_bytes = artifact.size_bytes,
            "delivering via chunked path"
        );
        self.deliver_chunked(recipient, artifact, progress_tx).await?;
        Ok(DeliveryPath::Chunked)
    }

    async fn deliver_chunked(
        &self,
        recipient: &str,
        artifact: &Artifact,
        progress_tx: Option<&mpsc::Sender<DeliveryProgress>>,
    ) -> Result<(), DeliveryError> {
        // Holding the lock across the whole transfer keeps the session
        // single-flight, reconnect included.
        let session = self.session.lock().await;
        let mut high_water_percent = 0.0f32;

        match self
            .stream_once(&*session, recipient, artifact, progress_tx, &mut high_water_percent)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_connection_drop() => {
                warn!(file = %artifact.path.display(), "transfer dropped, reconnecting: {}", e);
                crate::metrics::SESSION_RECONNECTS.inc();
                session.reconnect().await?;
                // One restart; acquisition is never re-run for this.
                self.stream_once(&*session, recipient, artifact, progress_tx, &mut high_water_percent)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn stream_once(
        &self,
        session: &S,
        recipient: &str,
        artifact: &Artifact,
        progress_tx: Option<&mpsc::Sender<DeliveryProgress>>,
        high_water_percent: &mut f32,
    ) -> Result<(), DeliveryError> {
        let name = file_name(&artifact.path);
        session.begin(recipient, &name, artifact.size_bytes).await?;

        let mut file = tokio::fs::File::open(&artifact.path).await?;
        let mut buf = vec![0u8; self.config.chunk_size_bytes.max(1)];
        let mut transferred = 0u64;

        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            session.send_chunk(&buf[..n]).await?;
            transferred += n as u64;

            if let Some(tx) = progress_tx {
                let raw = transferred as f32 / artifact.size_bytes.max(1) as f32 * 100.0;
                // Held at the high-water mark so a restart never reports a
                // lower percentage than already seen.
                *high_water_percent = high_water_percent.max(raw.min(100.0));
                let _ = tx.try_send(DeliveryProgress {
                    artifact: artifact.path.clone(),
                    transferred_bytes: transferred,
                    total_bytes: artifact.size_bytes,
                    percent: *high_water_percent,
                });
            }
        }

        session.commit().await
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string())
}
