//! Workspace cleanup for per-job download directories.
//!
//! Every job gets its own directory under the download root. The
//! coordinator removes it exactly once when the job reaches a terminal
//! state, and a background sweep reclaims anything left behind by
//! crashes or aborted runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

/// Tracks live job directories and sweeps stale leftovers.
pub struct CleanupCoordinator {
    root: PathBuf,
    stale_after: Duration,
    sweep_interval: Duration,
    tracked: Arc<RwLock<HashMap<String, PathBuf>>>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl CleanupCoordinator {
    pub fn new(root: impl Into<PathBuf>, stale_after: Duration, sweep_interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            root: root.into(),
            stale_after,
            sweep_interval,
            tracked: Arc::new(RwLock::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate and register the directory for a new job.
    pub async fn register(&self, job_id: &str) -> std::io::Result<PathBuf> {
        let dir = self.root.join(job_id);
        tokio::fs::create_dir_all(&dir).await?;
        self.tracked
            .write()
            .await
            .insert(job_id.to_string(), dir.clone());
        Ok(dir)
    }

    /// Remove a job's directory. Safe to call from every exit path: only
    /// the first call for a given job does anything.
    pub async fn finish(&self, job_id: &str) -> bool {
        let dir = match self.tracked.write().await.remove(job_id) {
            Some(dir) => dir,
            None => return false,
        };
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(job_id, dir = %dir.display(), "failed to remove job directory: {}", e);
            }
        }
        debug!(job_id, "job directory removed");
        true
    }

    pub async fn tracked_count(&self) -> usize {
        self.tracked.read().await.len()
    }

    /// Start the periodic sweep of the download root.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Cleanup sweep already running");
            return;
        }

        let root = self.root.clone();
        let stale_after = self.stale_after;
        let sweep_interval = self.sweep_interval;
        let tracked = Arc::clone(&self.tracked);
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!(root = %root.display(), "Cleanup sweep started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Cleanup sweep received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(sweep_interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        let live: Vec<PathBuf> =
                            tracked.read().await.values().cloned().collect();
                        if let Err(e) = sweep_once(&root, stale_after, &live).await {
                            warn!("Cleanup sweep failed: {}", e);
                        }
                    }
                }
            }
            info!("Cleanup sweep stopped");
        });
    }

    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());
    }
}

/// Delete untracked entries under `root` that have not been modified for
/// `stale_after`. Tracked directories belong to live jobs and are never
/// touched regardless of age.
pub async fn sweep_once(
    root: &Path,
    stale_after: Duration,
    live: &[PathBuf],
) -> std::io::Result<usize> {
    let mut removed = 0usize;
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if live.iter().any(|dir| *dir == path) {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(_) => continue,
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or(Duration::ZERO);
        if age < stale_after {
            continue;
        }

        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        match result {
            Ok(()) => {
                info!(path = %path.display(), "removed stale download entry");
                removed += 1;
            }
            Err(e) => warn!(path = %path.display(), "failed to remove stale entry: {}", e),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn coordinator(root: &TempDir) -> CleanupCoordinator {
        CleanupCoordinator::new(
            root.path(),
            Duration::ZERO,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_register_creates_directory() {
        let root = TempDir::new().unwrap();
        let coordinator = coordinator(&root);

        let dir = coordinator.register("job-1").await.unwrap();
        assert!(dir.is_dir());
        assert_eq!(coordinator.tracked_count().await, 1);
    }

    #[tokio::test]
    async fn test_finish_removes_directory_exactly_once() {
        let root = TempDir::new().unwrap();
        let coordinator = coordinator(&root);

        let dir = coordinator.register("job-1").await.unwrap();
        std::fs::write(dir.join("clip.mp4"), b"data").unwrap();

        assert!(coordinator.finish("job-1").await);
        assert!(!dir.exists());

        // Double finish is a no-op.
        assert!(!coordinator.finish("job-1").await);
        assert!(!coordinator.finish("unknown").await);
    }

    #[tokio::test]
    async fn test_sweep_removes_stale_untracked_entries() {
        let root = TempDir::new().unwrap();
        let coordinator = coordinator(&root);

        // A live job directory, an orphaned directory, and a stray file.
        let live = coordinator.register("job-1").await.unwrap();
        let orphan = root.path().join("job-dead");
        std::fs::create_dir(&orphan).unwrap();
        std::fs::write(orphan.join("partial.mp4"), b"data").unwrap();
        let stray = root.path().join("stray.tmp");
        std::fs::write(&stray, b"x").unwrap();

        let removed = sweep_once(root.path(), Duration::ZERO, &[live.clone()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(live.is_dir());
        assert!(!orphan.exists());
        assert!(!stray.exists());
    }

    #[tokio::test]
    async fn test_sweep_spares_recent_entries() {
        let root = TempDir::new().unwrap();
        let fresh = root.path().join("job-fresh");
        std::fs::create_dir(&fresh).unwrap();

        let removed = sweep_once(root.path(), Duration::from_secs(3600), &[])
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert!(fresh.is_dir());
    }

    #[tokio::test]
    async fn test_sweep_of_missing_root_is_empty() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("nope");
        let removed = sweep_once(&missing, Duration::ZERO, &[]).await.unwrap();
        assert_eq!(removed, 0);
    }
}
