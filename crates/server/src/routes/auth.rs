// crates/server/src/routes/auth.rs
//! Session endpoints.
//!
//! - POST /auth/mock-login: mint a session (dev auth only)
//! - GET  /auth/session: the caller's current session

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthSession, AuthUser, User};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MockLoginRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct MockLoginResponse {
    pub token: String,
    pub user: User,
}

/// POST /api/auth/mock-login
///
/// Stands in for the external identity provider. Answers 404 unless the
/// server runs with dev auth.
async fn mock_login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MockLoginRequest>,
) -> ApiResult<Json<MockLoginResponse>> {
    let idp = state
        .mock_idp
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("mock login is disabled".to_string()))?;

    let email = body.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("a valid email is required".to_string()));
    }

    let (token, session) = idp.issue(email, body.name.as_deref());
    Ok(Json(MockLoginResponse {
        token,
        user: session.user,
    }))
}

/// GET /api/auth/session
async fn current_session(AuthUser(session): AuthUser) -> Json<AuthSession> {
    Json(session)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/mock-login", post(mock_login))
        .route("/auth/session", get(current_session))
}
