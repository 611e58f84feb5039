// crates/server/src/routes/upload.rs
//! Upload intake.
//!
//! The upload URL handed out by `/documents/upload-url` is the only
//! credential needed here. Bytes are stored as-is and processing starts
//! once the body has been read.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use glassbox_core::JobId;
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

/// Largest accepted document.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct UploadResponse {
    pub success: bool,
}

/// POST /api/upload/{fileId}
async fn upload(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<UploadResponse>> {
    let job_id = JobId::new(file_id);

    // Starting first means a repeated upload is rejected without
    // replacing the stored bytes.
    let scenario = state.driver.start(&job_id)?;
    tracing::info!(job_id = %job_id, bytes = body.len(), scenario = ?scenario, "upload received");
    if !state.documents.insert(job_id.clone(), body) {
        tracing::warn!(job_id = %job_id, "document not kept; its PDF will be unavailable");
    }

    Ok(Json(UploadResponse { success: true }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload/{file_id}", post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
