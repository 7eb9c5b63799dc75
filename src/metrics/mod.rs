//! Prometheus metrics for the notification dispatch subsystem:
//! - dispatch outcome counters (fulfilled, validation-rejected, failed, cancelled)
//! - delivery attempt counter
//! - end-to-end dispatch duration histogram

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec, TextEncoder,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "campus_notify";

lazy_static! {
    /// Total dispatch calls
    pub static ref DISPATCHES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_dispatches_total", METRIC_PREFIX),
        "Total notification dispatch calls"
    ).unwrap();

    /// Dispatches confirmed by the backend
    pub static ref DISPATCH_FULFILLED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_dispatch_fulfilled_total", METRIC_PREFIX),
        "Dispatches accepted by the notification backend"
    ).unwrap();

    /// Dispatches rejected by local validation, by failing rule
    pub static ref DISPATCH_REJECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_dispatch_rejected_total", METRIC_PREFIX),
        "Dispatches rejected before any network call",
        &["reason"]
    ).unwrap();

    /// Dispatches that exhausted the retry budget
    pub static ref DISPATCH_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_dispatch_failed_total", METRIC_PREFIX),
        "Dispatches that failed after exhausting retries"
    ).unwrap();

    /// Dispatches aborted by a cancel token
    pub static ref DISPATCH_CANCELLED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_dispatch_cancelled_total", METRIC_PREFIX),
        "Dispatches cancelled by the caller"
    ).unwrap();

    /// Network attempts across all dispatches
    pub static ref DELIVERY_ATTEMPTS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_delivery_attempts_total", METRIC_PREFIX),
        "Individual delivery attempts, including retries"
    ).unwrap();

    /// End-to-end dispatch duration including backoff sleeps
    pub static ref DISPATCH_DURATION_SECONDS: Histogram = register_histogram!(
        format!("{}_dispatch_duration_seconds", METRIC_PREFIX),
        "Dispatch duration from pending to terminal state",
        vec![0.1, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0]
    ).unwrap();
}

/// Recording helpers for the dispatch path.
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn record_dispatched() {
        DISPATCHES_TOTAL.inc();
    }

    pub fn record_fulfilled(attempts: u32, duration_seconds: f64) {
        DISPATCH_FULFILLED_TOTAL.inc();
        DELIVERY_ATTEMPTS_TOTAL.inc_by(attempts as u64);
        DISPATCH_DURATION_SECONDS.observe(duration_seconds);
    }

    pub fn record_validation_rejected(reason: &str) {
        DISPATCH_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn record_delivery_failed(attempts: u32, duration_seconds: f64) {
        DISPATCH_FAILED_TOTAL.inc();
        DELIVERY_ATTEMPTS_TOTAL.inc_by(attempts as u64);
        DISPATCH_DURATION_SECONDS.observe(duration_seconds);
    }

    pub fn record_cancelled() {
        DISPATCH_CANCELLED_TOTAL.inc();
    }
}

/// Encode the current metric registry in Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families)
}
