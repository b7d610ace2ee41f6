//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Scheduler (jobs submitted, completed, failed, cancelled)
//! - Acquisition (duration, retries, fallbacks)
//! - Delivery (bytes shipped per path)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Scheduler Metrics
// =============================================================================

/// Jobs submitted total by platform.
pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("clipflow_jobs_submitted_total", "Total jobs submitted"),
        &["platform"],
    )
    .unwrap()
});

/// Jobs that reached a terminal state, by platform and outcome.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("clipflow_jobs_finished_total", "Total jobs finished"),
        &["platform", "outcome"], // "completed", "failed", "cancelled", "timed_out"
    )
    .unwrap()
});

// =============================================================================
// Acquisition Metrics
// =============================================================================

/// Acquisition duration in seconds.
pub static ACQUISITION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "clipflow_acquisition_duration_seconds",
            "Duration of the acquisition phase",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["platform"],
    )
    .unwrap()
});

/// Acquisition attempts per job (retries included).
pub static ACQUISITION_ATTEMPTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "clipflow_acquisition_attempts",
            "Acquisition attempts per finished job",
        )
        .buckets(vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        &["platform"],
    )
    .unwrap()
});

/// Fallback tool invocations total.
pub static FALLBACK_INVOCATIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "clipflow_fallback_invocations_total",
        "Total fallback tool invocations after a primary tool failure",
    )
    .unwrap()
});

// =============================================================================
// Delivery Metrics
// =============================================================================

/// Bytes delivered total by path.
pub static DELIVERED_BYTES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("clipflow_delivered_bytes_total", "Total bytes delivered"),
        &["path"], // "direct", "chunked"
    )
    .unwrap()
});

/// Chunked-session reconnects total.
pub static SESSION_RECONNECTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "clipflow_session_reconnects_total",
        "Total chunked-session reconnects after a dropped transfer",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(ACQUISITION_DURATION.clone()),
        Box::new(ACQUISITION_ATTEMPTS.clone()),
        Box::new(FALLBACK_INVOCATIONS.clone()),
        Box::new(DELIVERED_BYTES.clone()),
        Box::new(SESSION_RECONNECTS.clone()),
    ]
}
