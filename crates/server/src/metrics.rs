// crates/server/src/metrics.rs
//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Metric descriptions (the job lifecycle metrics are recorded in
//!   `glassbox-core`, HTTP request metrics here)
//! - A request-tracking middleware

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Call once at startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!(
        "glassbox_jobs_created_total",
        "Jobs registered through the upload-url endpoint"
    );
    describe_counter!("glassbox_jobs_started_total", "Jobs whose processing started");
    describe_counter!(
        "glassbox_stage_events_published_total",
        "Stage events published on the event bus, by stage"
    );
    describe_counter!(
        "glassbox_handler_panics_total",
        "Event bus handlers that panicked during delivery"
    );
    describe_gauge!("glassbox_live_channels", "Attached live status channels");
    describe_gauge!(
        "glassbox_documents_bytes",
        "Bytes of uploaded documents held in memory"
    );
    describe_counter!(
        "glassbox_http_requests_total",
        "HTTP requests by matched route and status"
    );
    describe_histogram!(
        "glassbox_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record a completed HTTP request.
pub fn record_request(endpoint: &str, status: u16, duration: Duration) {
    counter!(
        "glassbox_http_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("glassbox_http_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

/// Middleware recording request count and latency per matched route.
///
/// For SSE routes the latency covers only the handshake.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();
    let response = next.run(request).await;
    record_request(&endpoint, response.status().as_u16(), start.elapsed());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_request("/api/health", 200, Duration::from_millis(3));
    }

    #[test]
    fn test_init_and_render() {
        init_metrics();
        assert!(!init_metrics());
        record_request("/api/health", 200, Duration::from_millis(3));
        let output = render_metrics().expect("metrics initialized");
        assert!(output.contains("glassbox_http_requests_total"));
    }
}
