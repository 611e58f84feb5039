// crates/server/src/routes/health.rs
//! Liveness check.
//!
//! `accepting_subscribers` flips to `false` once shutdown has closed the
//! event bus, so a load balancer can stop routing new status feeds here
//! while in-flight requests drain.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub accepting_subscribers: bool,
}

/// GET /api/health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        accepting_subscribers: !state.bus.is_closed(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use glassbox_core::ManualScheduler;
    use tower::ServiceExt;

    use crate::config::Config;

    async fn health(state: Arc<AppState>) -> HealthResponse {
        let response = router()
            .with_state(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_reports_bus_shutdown() {
        let state = AppState::with_scheduler(&Config::default(), Arc::new(ManualScheduler::new()));

        let before = health(state.clone()).await;
        assert_eq!(before.status, "ok");
        assert_eq!(before.version, env!("CARGO_PKG_VERSION"));
        assert!(before.accepting_subscribers);

        state.bus.shutdown();
        let after = health(state).await;
        assert_eq!(after.status, "ok");
        assert!(!after.accepting_subscribers);
    }
}
