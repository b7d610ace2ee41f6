//! Job scheduler implementation.
//!
//! A FIFO queue drained by a fixed pool of worker tasks. Submission is
//! non-blocking and assigns a global position; workers drive each job
//! through acquisition, delivery and cleanup, always ending in a
//! terminal state.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, Mutex, Notify, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cleanup::CleanupCoordinator;
use crate::delivery::{
    DeliveryPath, DeliveryProgress, DeliveryRouter, DirectTransport, LargeFileSession,
};
use crate::fetcher::{Acquirer, FetchRequest};
use crate::limiter::RateLimiter;
use crate::metrics;
use crate::platform::{self, Platform};

use super::config::SchedulerConfig;
use super::types::{Job, JobEvent, JobState, SchedulerError};

type JobMap = Arc<RwLock<HashMap<String, Job>>>;

/// The job scheduler - a bounded worker pool over a FIFO queue.
pub struct JobScheduler<D, S>
where
    D: DirectTransport + 'static,
    S: LargeFileSession + 'static,
{
    config: SchedulerConfig,
    acquirer: Arc<dyn Acquirer>,
    router: Arc<DeliveryRouter<D, S>>,
    limiter: Arc<RateLimiter>,
    cleanup: Arc<CleanupCoordinator>,

    // Runtime state
    jobs: JobMap,
    cancellations: Arc<RwLock<HashMap<String, Arc<Notify>>>>,
    queue_tx: mpsc::UnboundedSender<String>,
    queue_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    events_tx: broadcast::Sender<JobEvent>,
    next_position: AtomicU64,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl<D, S> JobScheduler<D, S>
where
    D: DirectTransport + 'static,
    S: LargeFileSession + 'static,
{
    pub fn new(
        config: SchedulerConfig,
        acquirer: Arc<dyn Acquirer>,
        router: Arc<DeliveryRouter<D, S>>,
        limiter: Arc<RateLimiter>,
        cleanup: Arc<CleanupCoordinator>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(256);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            acquirer,
            router,
            limiter,
            cleanup,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            cancellations: Arc::new(RwLock::new(HashMap::new())),
            queue_tx,
            queue_rx: Arc::new(Mutex::new(queue_rx)),
            events_tx,
            next_position: AtomicU64::new(0),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Subscribe to job state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events_tx.subscribe()
    }

    pub async fn job(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// All known jobs in submission order.
    pub async fn jobs(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by_key(|j| j.position);
        jobs
    }

    /// Enqueue a download job. Never blocks: the queue position is
    /// assigned and returned immediately.
    pub async fn submit(&self, identity: &str, url: &str) -> Result<Job, SchedulerError> {
        let platform = platform::identify(url)?;
        // Unrecognized hosts are refused up front rather than queued to fail.
        if platform == Platform::Unknown {
            return Err(SchedulerError::UnsupportedPlatform(platform));
        }

        let mut jobs = self.jobs.write().await;
        let active = jobs
            .values()
            .filter(|j| j.identity == identity && !j.state.is_terminal())
            .count();
        if active >= self.config.max_per_identity {
            return Err(SchedulerError::IdentityBusy {
                identity: identity.to_string(),
                limit: self.config.max_per_identity,
            });
        }

        let position = self.next_position.fetch_add(1, Ordering::SeqCst);
        let job = Job {
            id: short_id(),
            identity: identity.to_string(),
            url: url.to_string(),
            platform,
            state: JobState::Queued { position },
            attempts: 0,
            created_at: Utc::now(),
            position,
        };
        jobs.insert(job.id.clone(), job.clone());
        drop(jobs);

        self.cancellations
            .write()
            .await
            .insert(job.id.clone(), Arc::new(Notify::new()));
        self.queue_tx
            .send(job.id.clone())
            .map_err(|_| SchedulerError::ShutDown)?;

        metrics::JOBS_SUBMITTED
            .with_label_values(&[platform.as_str()])
            .inc();
        let _ = self.events_tx.send(JobEvent {
            job_id: job.id.clone(),
            state: job.state.clone(),
            at: Utc::now(),
        });
        info!(job_id = %job.id, %platform, position, "Job submitted");
        Ok(job)
    }

    /// Cancel a job. Queued jobs never run; running jobs are signaled
    /// and wind down cooperatively, their artifacts still swept.
    pub async fn cancel(&self, job_id: &str) -> Result<(), SchedulerError> {
        let queued_platform = {
            let mut jobs = self.jobs.write().await;
            let job = jobs
                .get_mut(job_id)
                .ok_or_else(|| SchedulerError::UnknownJob(job_id.to_string()))?;
            if job.state.is_terminal() {
                return Ok(());
            }
            if matches!(job.state, JobState::Queued { .. }) {
                job.state = JobState::Cancelled;
                Some(job.platform)
            } else {
                None
            }
        };

        match queued_platform {
            Some(platform) => {
                // Never ran: nothing to clean up, the worker will skip it.
                self.cancellations.write().await.remove(job_id);
                metrics::JOBS_FINISHED
                    .with_label_values(&[platform.as_str(), "cancelled"])
                    .inc();
                let _ = self.events_tx.send(JobEvent {
                    job_id: job_id.to_string(),
                    state: JobState::Cancelled,
                    at: Utc::now(),
                });
                info!(job_id, "Queued job cancelled");
            }
            None => {
                if let Some(notify) = self.cancellations.read().await.get(job_id) {
                    notify.notify_one();
                }
                info!(job_id, "Cancellation signaled to running job");
            }
        }
        Ok(())
    }

    /// Start the worker pool.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        info!(
            workers = self.config.max_concurrent_jobs,
            "Starting job scheduler"
        );
        for worker_idx in 0..self.config.max_concurrent_jobs.max(1) {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.worker_loop(worker_idx).await;
            });
        }
    }

    /// Stop the worker pool gracefully.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("Stopping job scheduler");
        let _ = self.shutdown_tx.send(());
    }

    async fn worker_loop(&self, worker_idx: usize) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        debug!(worker_idx, "Worker started");
        loop {
            let job_id = tokio::select! {
                _ = shutdown_rx.recv() => break,
                id = next_queued(&self.queue_rx) => match id {
                    Some(id) => id,
                    None => break,
                }
            };
            if !self.running.load(Ordering::Relaxed) {
                break;
            }
            self.process_job(&job_id).await;
        }
        debug!(worker_idx, "Worker stopped");
    }

    async fn process_job(&self, job_id: &str) {
        let job = match self.jobs.read().await.get(job_id).cloned() {
            Some(job) => job,
            None => return,
        };
        if job.state.is_terminal() {
            debug!(job_id, "Skipping job cancelled while queued");
            return;
        }
        let notify = match self.cancellations.read().await.get(job_id).cloned() {
            Some(notify) => notify,
            None => Arc::new(Notify::new()),
        };

        apply_state(
            &self.jobs,
            &self.events_tx,
            job_id,
            JobState::Running {
                started_at: Utc::now(),
            },
        )
        .await;

        let outcome = match self.cleanup.register(job_id).await {
            Err(e) => JobState::Failed {
                reason: format!("could not prepare workspace: {}", e),
            },
            Ok(job_dir) => {
                let timeout = Duration::from_secs(self.config.job_timeout_secs);
                tokio::select! {
                    _ = notify.notified() => JobState::Cancelled,
                    run = tokio::time::timeout(timeout, self.run_job(&job, &job_dir)) => {
                        match run {
                            Err(_) => JobState::TimedOut {
                                timeout_secs: self.config.job_timeout_secs,
                            },
                            Ok(Ok(delivered)) => JobState::Completed {
                                delivered_artifacts: delivered,
                                completed_at: Utc::now(),
                            },
                            Ok(Err(reason)) => JobState::Failed { reason },
                        }
                    }
                }
            }
        };

        // Artifacts are swept on every exit path.
        self.cleanup.finish(job_id).await;
        self.cancellations.write().await.remove(job_id);

        match &outcome {
            JobState::Completed {
                delivered_artifacts,
                ..
            } => info!(job_id, delivered = *delivered_artifacts, "Job completed"),
            JobState::Failed { reason } => warn!(job_id, reason = %reason, "Job failed"),
            JobState::Cancelled => info!(job_id, "Job cancelled"),
            JobState::TimedOut { timeout_secs } => {
                warn!(job_id, timeout_secs = *timeout_secs, "Job timed out")
            }
            _ => {}
        }
        metrics::JOBS_FINISHED
            .with_label_values(&[job.platform.as_str(), outcome.name()])
            .inc();
        apply_state(&self.jobs, &self.events_tx, job_id, outcome).await;
    }

    /// Acquisition plus delivery. Any error becomes the job's terminal
    /// failure reason.
    async fn run_job(&self, job: &Job, job_dir: &Path) -> Result<usize, String> {
        self.limiter.admit(job.platform.as_str()).await;

        let request = FetchRequest {
            url: job.url.clone(),
            platform: job.platform,
            identity: job.identity.clone(),
            job_dir: job_dir.to_path_buf(),
        };

        let started = Instant::now();
        let result = self
            .acquirer
            .acquire(&request)
            .await
            .map_err(|e| e.to_string())?;
        metrics::ACQUISITION_DURATION
            .with_label_values(&[job.platform.as_str()])
            .observe(started.elapsed().as_secs_f64());
        metrics::ACQUISITION_ATTEMPTS
            .with_label_values(&[job.platform.as_str()])
            .observe(result.attempts as f64);
        if let Some(entry) = self.jobs.write().await.get_mut(&job.id) {
            entry.attempts = result.attempts;
        }

        // Forward delivery progress as Uploading state changes.
        let (progress_tx, mut progress_rx) = mpsc::channel::<DeliveryProgress>(32);
        let jobs = Arc::clone(&self.jobs);
        let events_tx = self.events_tx.clone();
        let progress_job_id = job.id.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(progress) = progress_rx.recv().await {
                apply_state(
                    &jobs,
                    &events_tx,
                    &progress_job_id,
                    JobState::Uploading {
                        percent: progress.percent,
                    },
                )
                .await;
            }
        });

        let mut delivered = 0usize;
        let mut delivery_error = None;
        for artifact in &result.artifacts {
            match self
                .router
                .deliver(&job.identity, artifact, Some(&progress_tx))
                .await
            {
                Ok(path) => {
                    let label = match path {
                        DeliveryPath::Direct => "direct",
                        DeliveryPath::Chunked => "chunked",
                    };
                    metrics::DELIVERED_BYTES
                        .with_label_values(&[label])
                        .inc_by(artifact.size_bytes);
                    delivered += 1;
                }
                Err(e) => {
                    delivery_error = Some(format!("content acquired but delivery failed: {}", e));
                    break;
                }
            }
        }
        drop(progress_tx);
        let _ = forwarder.await;

        match delivery_error {
            Some(reason) => Err(reason),
            None => Ok(delivered),
        }
    }
}

async fn next_queued(queue_rx: &Mutex<mpsc::UnboundedReceiver<String>>) -> Option<String> {
    queue_rx.lock().await.recv().await
}

/// Record a state change and broadcast it. Terminal states are final: a
/// late transition (a buffered progress update racing a cancellation) is
/// dropped rather than applied, so a finished job can never regress to a
/// non-terminal state.
async fn apply_state(
    jobs: &RwLock<HashMap<String, Job>>,
    events_tx: &broadcast::Sender<JobEvent>,
    job_id: &str,
    state: JobState,
) {
    if let Some(job) = jobs.write().await.get_mut(job_id) {
        if job.state.is_terminal() {
            return;
        }
        job.state = state.clone();
    }
    let _ = events_tx.send(JobEvent {
        job_id: job_id.to_string(),
        state,
        at: Utc::now(),
    });
}

fn short_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
