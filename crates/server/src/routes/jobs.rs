// crates/server/src/routes/jobs.rs
//! Job status snapshot.
//!
//! - GET /jobs/{fileId}: latest stage event, for clients that poll or
//!   reconnect after missing live updates

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use glassbox_core::{JobId, StageEvent};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub file_id: JobId,
    pub filename: String,
    /// `None` until processing starts.
    pub update: Option<StageEvent>,
}

/// GET /api/jobs/{fileId}
async fn job_snapshot(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(file_id): Path<String>,
) -> ApiResult<Json<JobSnapshot>> {
    let job_id = JobId::new(file_id);
    let metadata = state
        .registry
        .get(&job_id)
        .ok_or_else(|| ApiError::JobNotFound(job_id.to_string()))?;

    Ok(Json(JobSnapshot {
        update: state.driver.status(&job_id),
        filename: metadata.filename,
        file_id: job_id,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/jobs/{file_id}", get(job_snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use glassbox_core::{JobMetadata, ManualScheduler, Stage};
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::config::Config;

    async fn fetch(app: Router, uri: &str) -> (StatusCode, Option<JobSnapshot>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).ok())
    }

    #[tokio::test]
    async fn test_snapshot_follows_progress() {
        let scheduler = Arc::new(ManualScheduler::new());
        let config = Config {
            dev_auth: true,
            ..Config::default()
        };
        let state = AppState::with_scheduler(&config, scheduler.clone());
        let id = JobId::new("snap");
        state
            .registry
            .create(id.clone(), JobMetadata::new("test.pdf"))
            .unwrap();
        let app = router().with_state(state.clone());

        let (status, snapshot) = fetch(app.clone(), "/jobs/snap").await;
        assert_eq!(status, StatusCode::OK);
        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.filename, "test.pdf");
        assert!(snapshot.update.is_none());

        state.driver.start(&id).unwrap();
        scheduler.advance(Duration::from_secs(4));
        let (_, snapshot) = fetch(app, "/jobs/snap").await;
        let update = snapshot.unwrap().update.unwrap();
        assert_eq!(update.stage, Stage::OcrProcessing);
        assert_eq!(update.progress_percent, 30);
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let config = Config {
            dev_auth: true,
            ..Config::default()
        };
        let state = AppState::with_scheduler(&config, Arc::new(ManualScheduler::new()));
        let (status, _) = fetch(router().with_state(state), "/jobs/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
