// crates/server/src/routes/billing.rs
//! Billing proposal lookup.
//!
//! - GET /billing/{fileId}: proposed line items and the document link

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use glassbox_core::{BillingProfile, JobId, LineItem};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingResponse {
    pub items: Vec<LineItem>,
    pub total_amount: f64,
    pub document_url: String,
}

/// GET /api/billing/{fileId}
///
/// Unknown ids get the default proposal rather than an error.
async fn billing_proposal(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(file_id): Path<String>,
) -> Json<BillingResponse> {
    let job_id = JobId::new(file_id);
    let filename = state
        .registry
        .get(&job_id)
        .map(|m| m.filename)
        .unwrap_or_default();
    let profile = BillingProfile::classify(&filename);
    tracing::debug!(job_id = %job_id, profile = ?profile, "billing proposal");

    let items = profile.line_items();
    Json(BillingResponse {
        total_amount: glassbox_core::billing::total_amount(&items),
        items,
        document_url: state.document_url(&job_id),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/billing/{file_id}", get(billing_proposal))
}
