//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Availability checks and retry backoff
//! - Timestep downloads (results, duration, bytes)
//! - Post-processing hooks
//! - Pipeline invocations

use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Registry holding every core metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for collector in all_metrics() {
        // Names are static and unique, registration cannot collide.
        let _ = registry.register(collector);
    }
    registry
});

// =============================================================================
// Availability Metrics
// =============================================================================

/// Existence checks by result.
pub static AVAILABILITY_CHECKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "nwp_fetch_availability_checks_total",
            "Total availability checks",
        ),
        &["result"], // "present", "absent", "error"
    )
    .unwrap()
});

/// Backoff sleeps taken between checks.
pub static RETRY_SLEEPS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "nwp_fetch_retry_sleeps_total",
        "Total backoff sleeps between availability checks",
    )
    .unwrap()
});

// =============================================================================
// Download Metrics
// =============================================================================

/// Downloads by result.
pub static DOWNLOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nwp_fetch_downloads_total", "Total timestep downloads"),
        &["result"], // "completed", "failed"
    )
    .unwrap()
});

/// Download duration in seconds.
pub static DOWNLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "nwp_fetch_download_duration_seconds",
            "Duration of a single timestep download",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["result"],
    )
    .unwrap()
});

/// Bytes written to disk by completed downloads.
pub static DOWNLOAD_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "nwp_fetch_download_bytes_total",
        "Total bytes written by completed downloads",
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Post-processing hook invocations by result.
pub static POST_PROCESS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "nwp_fetch_post_process_total",
            "Total post-processing hook invocations",
        ),
        &["result"], // "ok", "failed"
    )
    .unwrap()
});

/// Per-timestep terminal states.
pub static TIMESTEPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nwp_fetch_timesteps_total", "Timesteps by terminal state"),
        &["status"], // "success" or a failure kind
    )
    .unwrap()
});

/// Pipeline invocations by outcome.
pub static PIPELINE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nwp_fetch_pipeline_runs_total", "Total pipeline invocations"),
        &["outcome"], // "complete", "partial", "run_unavailable", "error"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(AVAILABILITY_CHECKS.clone()),
        Box::new(RETRY_SLEEPS.clone()),
        Box::new(DOWNLOADS.clone()),
        Box::new(DOWNLOAD_DURATION.clone()),
        Box::new(DOWNLOAD_BYTES.clone()),
        Box::new(POST_PROCESS.clone()),
        Box::new(TIMESTEPS.clone()),
        Box::new(PIPELINE_RUNS.clone()),
    ]
}

/// Render the registry in the Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_core_metrics() {
        DOWNLOADS.with_label_values(&["completed"]).inc();
        RETRY_SLEEPS.inc();

        let text = encode_metrics().unwrap();
        assert!(text.contains("nwp_fetch_downloads_total"));
        assert!(text.contains("nwp_fetch_retry_sleeps_total"));
    }
}
