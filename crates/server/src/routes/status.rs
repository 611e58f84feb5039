// crates/server/src/routes/status.rs
//! Live status feed.
//!
//! - GET /status/{fileId}: SSE stream of the job's stage events

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use glassbox_core::{ClosePolicy, JobId, LiveStatusChannel};

use crate::error::ApiResult;
use crate::state::AppState;

/// SSE event name for stage updates.
pub const UPDATE_EVENT: &str = "update";

/// GET /api/status/{fileId}
///
/// The channel is attached before the response is returned, so a client
/// that connects ahead of the upload sees every stage. The stream stays
/// open after the terminal event and ends when the client goes away or the
/// event bus shuts down.
async fn status_stream(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    let job_id = JobId::new(file_id);
    let mut channel =
        LiveStatusChannel::attach(Arc::clone(&state.bus), job_id.clone(), ClosePolicy::KeepOpen)?;
    tracing::debug!(job_id = %job_id, "status stream opened");

    let stream = async_stream::stream! {
        while let Some(update) = channel.recv().await {
            match serde_json::to_string(&update) {
                Ok(json) => yield Ok(Event::default().event(UPDATE_EVENT).data(json)),
                Err(e) => tracing::warn!(job_id = %channel.job_id(), error = %e, "failed to encode stage event"),
            }
        }
        tracing::debug!(job_id = %channel.job_id(), "status stream closed");
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/status/{file_id}", get(status_stream))
}
