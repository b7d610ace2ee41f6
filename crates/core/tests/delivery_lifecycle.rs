//! Delivery path integration tests.
//!
//! These tests run the scheduler with small delivery thresholds so real
//! artifact bytes flow through the chunked session, covering path
//! selection, progress events, reconnects and size limits.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use clipflow_core::{
    testing::{MockAcquirer, MockDirectTransport, MockLargeFileSession},
    CleanupCoordinator, DeliveryConfig, DeliveryRouter, JobEvent, JobScheduler, JobState,
    RateLimiter, SchedulerConfig,
};

struct TestHarness {
    scheduler: Arc<JobScheduler<MockDirectTransport, MockLargeFileSession>>,
    acquirer: MockAcquirer,
    transport: MockDirectTransport,
    session: MockLargeFileSession,
    _root: TempDir,
}

impl TestHarness {
    /// Thresholds scaled down so a few KiB exercises both paths:
    /// direct below 1 KiB, chunked in 256 B chunks, 64 KiB hard cap.
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("clipflow_core=debug")
            .try_init();

        let root = TempDir::new().expect("Failed to create temp dir");
        let acquirer = MockAcquirer::new();
        let transport = MockDirectTransport::new();
        let session = MockLargeFileSession::new();

        let delivery = DeliveryConfig {
            size_threshold_bytes: 1024,
            max_size_bytes: 64 * 1024,
            chunk_size_bytes: 256,
        };
        let router = Arc::new(DeliveryRouter::new(
            delivery,
            transport.clone(),
            session.clone(),
        ));
        let limiter = Arc::new(RateLimiter::new(1000, Duration::from_secs(60)));
        let cleanup = Arc::new(CleanupCoordinator::new(
            root.path(),
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        ));
        let scheduler = Arc::new(JobScheduler::new(
            SchedulerConfig::default(),
            Arc::new(acquirer.clone()),
            router,
            limiter,
            cleanup,
        ));

        Self {
            scheduler,
            acquirer,
            transport,
            session,
            _root: root,
        }
    }
}

async fn collect_until_terminal(
    rx: &mut broadcast::Receiver<JobEvent>,
    job_id: &str,
) -> (JobState, Vec<f32>) {
    let mut percents = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for job event")
            .expect("event channel closed");
        if event.job_id != job_id {
            continue;
        }
        match event.state {
            JobState::Uploading { percent } => percents.push(percent),
            s if s.is_terminal() => return (s, percents),
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_small_artifact_goes_direct() {
    let h = TestHarness::new();
    h.acquirer.set_artifact_bytes(512).await;
    let mut rx = h.scheduler.subscribe();
    h.scheduler.start();

    let job = h
        .scheduler
        .submit("alice", "https://instagram.com/p/1")
        .await
        .unwrap();
    let (state, _) = collect_until_terminal(&mut rx, &job.id).await;
    assert!(matches!(state, JobState::Completed { .. }));

    assert_eq!(h.transport.sent_files().await.len(), 1);
    assert!(h.session.transfers().await.is_empty());
    h.scheduler.stop();
}

#[tokio::test]
async fn test_large_artifact_streams_in_chunks_with_progress() {
    let h = TestHarness::new();
    h.acquirer.set_artifact_bytes(4096).await;
    let mut rx = h.scheduler.subscribe();
    h.scheduler.start();

    let job = h
        .scheduler
        .submit("alice", "https://instagram.com/p/1")
        .await
        .unwrap();
    let (state, percents) = collect_until_terminal(&mut rx, &job.id).await;
    assert!(matches!(state, JobState::Completed { .. }));

    // 4096 bytes in 256-byte chunks, all accounted for.
    let transfers = h.session.transfers().await;
    assert_eq!(transfers.len(), 1);
    assert!(transfers[0].committed);
    assert_eq!(transfers[0].chunks.len(), 16);
    assert_eq!(transfers[0].chunks.iter().sum::<usize>(), 4096);
    assert!(h.transport.sent_files().await.is_empty());

    // Progress is monotonically non-decreasing.
    assert!(!percents.is_empty());
    for pair in percents.windows(2) {
        assert!(pair[1] >= pair[0], "progress went backwards: {:?}", percents);
    }
    h.scheduler.stop();
}

#[tokio::test]
async fn test_dropped_transfer_reconnects_and_completes() {
    let h = TestHarness::new();
    h.acquirer.set_artifact_bytes(2048).await;
    h.session.fail_after_chunks(3).await;
    let mut rx = h.scheduler.subscribe();
    h.scheduler.start();

    let job = h
        .scheduler
        .submit("alice", "https://instagram.com/p/1")
        .await
        .unwrap();
    let (state, percents) = collect_until_terminal(&mut rx, &job.id).await;
    assert!(matches!(state, JobState::Completed { .. }));

    assert_eq!(h.session.reconnects(), 1);
    let transfers = h.session.transfers().await;
    assert_eq!(transfers.len(), 2);
    assert!(!transfers[0].committed);
    assert!(transfers[1].committed);

    // The restart never reported a lower percentage than already seen.
    for pair in percents.windows(2) {
        assert!(pair[1] >= pair[0], "progress went backwards: {:?}", percents);
    }
    h.scheduler.stop();
}

#[tokio::test]
async fn test_oversize_artifact_fails_with_size_limit_reason() {
    let h = TestHarness::new();
    h.acquirer.set_artifact_bytes(128 * 1024).await;
    let mut rx = h.scheduler.subscribe();
    h.scheduler.start();

    let job = h
        .scheduler
        .submit("alice", "https://instagram.com/p/1")
        .await
        .unwrap();
    let (state, _) = collect_until_terminal(&mut rx, &job.id).await;
    match state {
        JobState::Failed { reason } => {
            assert!(reason.contains("delivery failed"), "reason: {}", reason);
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert!(h.session.transfers().await.is_empty());
    h.scheduler.stop();
}
