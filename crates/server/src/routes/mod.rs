//! API route handlers for the GlassBox server.

pub mod auth;
pub mod billing;
pub mod documents;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod status;
pub mod upload;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - POST /api/auth/mock-login - Mint a session (dev auth only)
/// - GET  /api/auth/session - Current session
/// - POST /api/documents/upload-url - Register a job, get its upload URL
/// - GET  /api/documents/{fileId}/pdf - Uploaded document bytes
/// - POST /api/upload/{fileId} - Upload intake, starts processing
/// - GET  /api/status/{fileId} - SSE stream of stage updates
/// - GET  /api/jobs/{fileId} - Latest stage snapshot
/// - GET  /api/billing/{fileId} - Billing proposal
/// - GET  /metrics - Prometheus metrics (no /api prefix)
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", auth::router())
        .nest("/api", documents::router())
        .nest("/api", upload::router())
        .nest("/api", status::router())
        .nest("/api", jobs::router())
        .nest("/api", billing::router())
        .merge(metrics::router())
        .with_state(state)
}
