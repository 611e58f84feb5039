//! Prometheus metrics endpoint.
//!
//! Exposes application metrics in Prometheus text format at `GET /metrics`.

use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::metrics::render_metrics;
use crate::state::AppState;

/// GET /metrics - Prometheus metrics endpoint.
///
/// Returns 503 Service Unavailable if metrics are not initialized.
pub async fn metrics_handler() -> Response {
    match render_metrics() {
        Some(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not initialized").into_response(),
    }
}

/// Create the metrics routes router.
///
/// Not nested under `/api`: `/metrics` is the standard scrape path.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(metrics_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::Config;
    use glassbox_core::ManualScheduler;

    #[tokio::test]
    async fn test_metrics_endpoint_renders_prometheus_text() {
        crate::metrics::init_metrics();
        crate::metrics::record_request("/api/health", 200, std::time::Duration::from_millis(1));

        let state = AppState::with_scheduler(&Config::default(), Arc::new(ManualScheduler::new()));
        let app = router().with_state(state);
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("glassbox_http_requests_total"));
    }
}
