//! Prometheus metrics for rotapost
//!
//! This module provides metrics tracking for:
//! - Scheduler: runs by termination reason, assignments produced, shortfall, run duration
//! - Outcomes: posted/skipped/failed results reported back for stored assignments
//! - API: requests by endpoint and status, request duration
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_histogram_vec, Counter,
    CounterVec, Encoder, Histogram, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for scheduler metrics
struct SchedulerMetrics {
    runs: CounterVec,
    assignments: Counter,
    shortfall: Counter,
    run_duration: Histogram,
    outcomes: CounterVec,
}

/// Container for API metrics
struct ApiMetrics {
    requests: CounterVec,
    duration: HistogramVec,
}

static SCHEDULER_METRICS: OnceLock<SchedulerMetrics> = OnceLock::new();

static API_METRICS: OnceLock<ApiMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, subsequent metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = rotapost::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let scheduler = SchedulerMetrics {
        runs: register_counter_vec!(
            "rotapost_scheduler_runs_total",
            "Scheduling runs by termination reason",
            &["termination"]
        )?,
        assignments: register_counter!(
            "rotapost_scheduler_assignments_total",
            "Total assignments produced"
        )?,
        shortfall: register_counter!(
            "rotapost_scheduler_shortfall_total",
            "Requested assignments that could not be placed"
        )?,
        run_duration: register_histogram!(
            "rotapost_scheduler_run_duration_seconds",
            "Time spent in one scheduling run",
            vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
        )?,
        outcomes: register_counter_vec!(
            "rotapost_assignment_outcomes_total",
            "Reported outcomes of stored assignments",
            &["outcome"]
        )?,
    };

    let api = ApiMetrics {
        requests: register_counter_vec!(
            "rotapost_api_requests_total",
            "Total API requests by endpoint and status",
            &["endpoint", "status"]
        )?,
        duration: register_histogram_vec!(
            "rotapost_api_request_duration_seconds",
            "API request duration in seconds",
            &["endpoint"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
        )?,
    };

    SCHEDULER_METRICS
        .set(scheduler)
        .map_err(|_| "Scheduler metrics already initialized")?;
    API_METRICS
        .set(api)
        .map_err(|_| "API metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    SCHEDULER_METRICS.get().is_some() && API_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record one finished scheduling run
pub fn record_scheduler_run(termination: &str, produced: usize, shortfall: usize, duration_secs: f64) {
    let Some(m) = SCHEDULER_METRICS.get() else {
        return;
    };

    m.runs.with_label_values(&[termination]).inc();
    m.assignments.inc_by(produced as f64);
    if shortfall > 0 {
        m.shortfall.inc_by(shortfall as f64);
    }
    m.run_duration.observe(duration_secs);
}

/// Record an outcome reported for a stored assignment
pub fn record_outcome(outcome: &str) {
    if let Some(m) = SCHEDULER_METRICS.get() {
        m.outcomes.with_label_values(&[outcome]).inc();
    }
}

/// Record API request
pub fn record_api_request(endpoint: &str, status: u16, duration_secs: f64) {
    let Some(m) = API_METRICS.get() else {
        return;
    };

    let status_str = status.to_string();
    m.requests
        .with_label_values(&[endpoint, status_str.as_str()])
        .inc();
    m.duration
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ensure_metrics_initialized() {
        let _ = init_metrics();
    }

    #[test]
    fn test_init_metrics_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_encode_metrics() {
        ensure_metrics_initialized();
        record_scheduler_run("completed", 4, 0, 0.002);
        let text = encode_metrics().unwrap();
        assert!(text.contains("rotapost_scheduler_runs_total"));
    }

    #[test]
    fn test_recording_does_not_panic() {
        ensure_metrics_initialized();
        record_scheduler_run("capacity_exhausted", 3, 1, 0.001);
        record_outcome("posted");
        record_api_request("/api/plans", 201, 0.01);
    }
}
