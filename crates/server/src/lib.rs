// crates/server/src/lib.rs
//! GlassBox server library.
//!
//! Axum HTTP surface over the job lifecycle in `glassbox-core`: upload
//! intake, the live status feed, billing lookups and session checks.

pub mod auth;
pub mod config;
pub mod documents;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::*;
pub use metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use std::path::Path;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes under `/api` and `/metrics`
/// - CORS for the configured frontend origins, with credentials
/// - Request tracing and request metrics
/// - The frontend bundle, when a static directory is configured
pub fn create_app(state: Arc<AppState>, config: &Config) -> Router {
    let mut app = api_routes(state);

    if let Some(dir) = config.resolved_static_dir() {
        tracing::info!(static_dir = %dir.display(), "serving frontend");
        app = app.fallback_service(spa_service(&dir));
    }

    app.layer(middleware::from_fn(metrics::track_requests))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Static files, with unknown paths answered by `index.html` so client-side
/// routes survive a reload.
fn spa_service(dir: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use glassbox_core::ManualScheduler;
    use tower::ServiceExt;

    fn test_app(config: &Config) -> Router {
        let state = AppState::with_scheduler(config, Arc::new(ManualScheduler::new()));
        create_app(state, config)
    }

    /// Helper to make a GET request to the app.
    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        (status, body_str)
    }

    // ========================================================================
    // Health Endpoint Tests
    // ========================================================================

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_app(&Config::default());
        let (status, body) = get(app, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["uptime_secs"].is_number());
    }

    // ========================================================================
    // CORS Tests
    // ========================================================================

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let app = test_app(&Config::default());

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/health")
                    .header("Origin", "http://localhost:5173")
                    .header("Access-Control-Request-Method", "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(
            headers.get("access-control-allow-credentials").unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_cors_rejects_unknown_origin() {
        let app = test_app(&Config::default());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("Origin", "http://evil.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(!response
            .headers()
            .contains_key("access-control-allow-origin"));
    }

    // ========================================================================
    // Routing Tests
    // ========================================================================

    #[tokio::test]
    async fn test_404_for_unknown_route() {
        let app = test_app(&Config::default());
        let (status, _) = get(app, "/api/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_spa_fallback_serves_index() {
        let dir = std::env::temp_dir().join(format!("glassbox-spa-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html>glassbox</html>").unwrap();

        let config = Config {
            static_dir: Some(dir.clone()),
            ..Config::default()
        };
        let (status, body) = get(test_app(&config), "/documents/abc").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("glassbox"));

        // API routes still win over the fallback.
        let (status, body) = get(test_app(&config), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"ok\""));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
