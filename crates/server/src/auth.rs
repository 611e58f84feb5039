// crates/server/src/auth.rs
//! Session lookup for protected endpoints.
//!
//! Identity is owned by an external provider; the server only asks it to
//! resolve a request's credentials into a session. `InMemoryAuthProvider`
//! is the built-in provider: bearer tokens or a session cookie, backed by a
//! map of sessions it minted itself through the mock login.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "glassbox.session_token";

/// Lifetime of minted sessions.
const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// A resolved (session, user) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    pub session: Session,
    pub user: User,
}

impl AuthSession {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.session.expires_at <= now
    }
}

/// Resolves request credentials to a session, or nothing.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn session(&self, headers: &HeaderMap) -> Option<AuthSession>;
}

/// Token-keyed session store with an optional development fallback.
pub struct InMemoryAuthProvider {
    sessions: DashMap<String, AuthSession>,
    dev_fallback: bool,
}

impl InMemoryAuthProvider {
    /// With `dev_fallback`, requests without a valid session resolve to a
    /// fixed development user instead of being rejected.
    pub fn new(dev_fallback: bool) -> Self {
        Self {
            sessions: DashMap::new(),
            dev_fallback,
        }
    }

    /// Mint a session for `email` and return its token.
    pub fn issue(&self, email: &str, name: Option<&str>) -> (String, AuthSession) {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let user_id = format!("user_{}", uuid::Uuid::new_v4().simple());
        let auth = AuthSession {
            session: Session {
                id: uuid::Uuid::new_v4().simple().to_string(),
                user_id: user_id.clone(),
                expires_at: Utc::now() + Duration::hours(SESSION_TTL_HOURS),
            },
            user: User {
                id: user_id,
                email: email.to_string(),
                name: name
                    .map(str::to_string)
                    .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string()),
            },
        };
        self.sessions.insert(token.clone(), auth.clone());
        tracing::info!(user = %auth.user.email, "session issued");
        (token, auth)
    }

    #[cfg(test)]
    fn insert(&self, token: impl Into<String>, session: AuthSession) {
        self.sessions.insert(token.into(), session);
    }

    #[cfg(test)]
    fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    fn lookup(&self, token: &str) -> Option<AuthSession> {
        let found = self.sessions.get(token).map(|s| s.value().clone())?;
        if found.is_expired(Utc::now()) {
            self.sessions.remove(token);
            tracing::debug!(user = %found.user.email, "expired session dropped");
            return None;
        }
        Some(found)
    }

    fn dev_session() -> AuthSession {
        AuthSession {
            session: Session {
                id: "dev-session".to_string(),
                user_id: "dev-user".to_string(),
                expires_at: Utc::now() + Duration::hours(SESSION_TTL_HOURS),
            },
            user: User {
                id: "dev-user".to_string(),
                email: "dev@glassbox.health".to_string(),
                name: "Dev User".to_string(),
            },
        }
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn session(&self, headers: &HeaderMap) -> Option<AuthSession> {
        if let Some(found) = request_token(headers).and_then(|t| self.lookup(t)) {
            return Some(found);
        }
        if self.dev_fallback {
            tracing::debug!("no active session; using development session");
            return Some(Self::dev_session());
        }
        None
    }
}

/// Bearer token first, then the session cookie.
fn request_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|t| !t.is_empty())
}

/// Extractor for handlers that require a signed-in user.
pub struct AuthUser(pub AuthSession);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        state
            .auth
            .session(&parts.headers)
            .await
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized)
    }
}
