//! Prometheus metrics for the repricing pipeline.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally: a registration
//! failure means duplicate metric names, a fatal configuration error that
//! should crash at startup. These panics only occur during static
//! initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge,
    CounterVec, HistogramVec, IntCounter, IntGauge, TextEncoder,
};

/// Events received per intake source.
pub static EVENTS_RECEIVED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "repricer_events_received_total",
        "Offer-change events received by source",
        &["source"]
    )
    .unwrap()
});

/// Terminal event outcomes.
pub static EVENTS_PROCESSED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "repricer_events_processed_total",
        "Events processed by terminal outcome (ok/skip/retry)",
        &["outcome"]
    )
    .unwrap()
});

/// Skips broken down by business reason.
pub static SKIPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "repricer_skips_total",
        "Skipped events by reason",
        &["reason"]
    )
    .unwrap()
});

/// Calculated prices written to the store.
pub static PRICES_WRITTEN_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "repricer_prices_written_total",
        "Calculated prices written to the store"
    )
    .unwrap()
});

/// Malformed payloads dropped at the normalizer.
pub static EVENTS_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "repricer_events_dropped_total",
        "Events dropped as malformed, by source",
        &["source"]
    )
    .unwrap()
});

/// End-to-end event processing latency.
pub static PROCESSING_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "repricer_processing_duration_ms",
        "End-to-end event processing time in milliseconds",
        &["source"],
        vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap()
});

/// Store errors by classification.
pub static STORE_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "repricer_store_errors_total",
        "Store gateway errors by classification (transient/structural)",
        &["kind"]
    )
    .unwrap()
});

/// Store circuit breaker state (0=closed, 1=open, 2=half-open).
pub static STORE_CIRCUIT_STATE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "repricer_store_circuit_state",
        "Store circuit breaker state (0=closed, 1=open, 2=half_open)"
    )
    .unwrap()
});

/// Webhook requests rejected, by cause.
pub static WEBHOOK_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "repricer_webhook_rejected_total",
        "Webhook requests rejected by cause (backpressure/malformed/unauthorized)",
        &["cause"]
    )
    .unwrap()
});

/// Queue polls that returned no messages.
pub static QUEUE_EMPTY_POLLS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "repricer_queue_empty_polls_total",
        "Long polls that returned no messages"
    )
    .unwrap()
});

/// Events currently in flight in the worker pool.
pub static EVENTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "repricer_events_in_flight",
        "Events currently being processed"
    )
    .unwrap()
});

/// Render all registered metrics in the prometheus text format.
pub fn render() -> crate::error::TelemetryResult<String> {
    let metric_families = prometheus::gather();
    Ok(TextEncoder::new().encode_to_string(&metric_families)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_render() {
        EVENTS_RECEIVED_TOTAL.with_label_values(&["amazon"]).inc();
        EVENTS_PROCESSED_TOTAL.with_label_values(&["ok"]).inc();
        SKIPS_TOTAL.with_label_values(&["out_of_stock"]).inc();
        PRICES_WRITTEN_TOTAL.inc();
        STORE_CIRCUIT_STATE.set(0);
        PROCESSING_DURATION_MS
            .with_label_values(&["amazon"])
            .observe(12.5);

        let text = render().unwrap();
        assert!(text.contains("repricer_events_received_total"));
        assert!(text.contains("repricer_prices_written_total"));
    }
}
