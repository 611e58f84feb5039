// crates/server/src/routes/documents.rs
//! Document endpoints.
//!
//! - POST /documents/upload-url: register a job and hand out its upload URL
//! - GET  /documents/{fileId}/pdf: the uploaded document bytes

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use glassbox_core::{JobId, JobMetadata};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadUrlRequest {
    pub filename: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub file_id: JobId,
    pub upload_url: String,
}

/// POST /api/documents/upload-url
async fn create_upload_url(
    State(state): State<Arc<AppState>>,
    AuthUser(session): AuthUser,
    Json(body): Json<UploadUrlRequest>,
) -> ApiResult<Json<UploadUrlResponse>> {
    // Stored as sent: classification compares the exact name.
    if body.filename.trim().is_empty() {
        return Err(ApiError::BadRequest("filename must not be empty".to_string()));
    }

    let job_id = JobId::generate();
    state
        .registry
        .create(job_id.clone(), JobMetadata::new(body.filename.clone()))?;
    metrics::counter!("glassbox_jobs_created_total").increment(1);
    tracing::info!(
        job_id = %job_id,
        filename = %body.filename,
        user = %session.user.email,
        "job registered"
    );

    Ok(Json(UploadUrlResponse {
        upload_url: state.upload_url(&job_id),
        file_id: job_id,
    }))
}

/// GET /api/documents/{fileId}/pdf
async fn document_pdf(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(file_id): Path<String>,
) -> ApiResult<Response> {
    let job_id = JobId::new(file_id);
    let bytes = state
        .documents
        .get(&job_id)
        .ok_or_else(|| ApiError::DocumentNotFound(job_id.to_string()))?;

    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents/upload-url", post(create_upload_url))
        .route("/documents/{file_id}/pdf", get(document_pdf))
}
