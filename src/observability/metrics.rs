//! Metrics collection and exposition.
//!
//! # Metrics
//! - `xray_segments_closed_total` (counter): closed segments by outcome
//! - `xray_segments_emitted_total` (counter): documents handed to the emitter
//! - `xray_emit_failures_total` (counter): documents the emitter rejected
//! - `xray_segment_duration_seconds` (histogram): segment open-to-close time
//! - `xray_request_duration_seconds` (histogram): middleware latency by method, status

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_segment_closed(outcome: &'static str, duration_secs: f64) {
    counter!("xray_segments_closed_total", "outcome" => outcome).increment(1);
    histogram!("xray_segment_duration_seconds").record(duration_secs.max(0.0));
}

pub fn record_segment_emitted() {
    counter!("xray_segments_emitted_total").increment(1);
}

pub fn record_emit_failure() {
    counter!("xray_emit_failures_total").increment(1);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    histogram!(
        "xray_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}
