//! Adapter metrics

use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};
use std::time::Duration;

lazy_static::lazy_static! {
    /// Total adapter requests by PSP, operation and outcome
    pub static ref PSP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "psp_requests_total",
        "Total PSP adapter requests",
        &["psp", "operation", "outcome"]
    )
    .unwrap();

    /// Adapter request duration by PSP and operation
    pub static ref PSP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "psp_request_duration_seconds",
        "PSP adapter request duration",
        &["psp", "operation"]
    )
    .unwrap();
}

/// Record one adapter call
pub fn observe_request(psp: &str, operation: &str, success: bool, duration: Duration) {
    PSP_REQUEST_DURATION
        .with_label_values(&[psp, operation])
        .observe(duration.as_secs_f64());
    let outcome = if success { "success" } else { "failure" };
    PSP_REQUESTS_TOTAL
        .with_label_values(&[psp, operation, outcome])
        .inc();
}
