//! Prometheus metrics for conversion jobs.
//!
//! This module provides metrics for:
//! - Job lifecycle (started, running, finished by result)
//! - Dispatcher rejections
//! - Output placement (backups)
//! - Encoder runtime

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Registry holding every metric below.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        if let Err(e) = registry.register(metric) {
            tracing::warn!("Failed to register metric: {}", e);
        }
    }
    registry
});

// =============================================================================
// Jobs
// =============================================================================

/// Jobs accepted by the supervisor.
pub static JOBS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("dropconv_jobs_started_total", "Total conversion jobs started").unwrap()
});

/// Jobs holding a concurrency slot.
pub static JOBS_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "dropconv_jobs_running",
        "Number of conversion jobs currently running",
    )
    .unwrap()
});

/// Jobs that reached a terminal state, by result.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "dropconv_jobs_finished_total",
            "Total conversion jobs finished",
        ),
        &["result"], // "completed" or a failure kind
    )
    .unwrap()
});

// =============================================================================
// Dispatcher
// =============================================================================

/// Dropped paths that did not pass validation.
pub static PATHS_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "dropconv_paths_rejected_total",
        "Total dropped paths rejected before starting a job",
    )
    .unwrap()
});

// =============================================================================
// Placement
// =============================================================================

/// Existing outputs moved into a backup directory.
pub static BACKUPS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "dropconv_backups_created_total",
        "Total existing outputs moved aside before encoding",
    )
    .unwrap()
});

// =============================================================================
// Encoder
// =============================================================================

/// Encoder runtime in seconds.
pub static ENCODE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "dropconv_encode_duration_seconds",
            "Duration of the encoder subprocess",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["kind", "result"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_STARTED.clone()),
        Box::new(JOBS_RUNNING.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(PATHS_REJECTED.clone()),
        Box::new(BACKUPS_CREATED.clone()),
        Box::new(ENCODE_DURATION.clone()),
    ]
}

/// Encode all metrics as Prometheus text format.
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
