//! Cookie sessions backed by storage
//!
//! Sessions live for seven days and are swept by a daily background task.
//! Validation failures are logged and treated as "not authenticated" so a
//! storage hiccup on one request never panics the process.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, HeaderMap};
use chrono::Utc;
use tracing::error;

use crate::models::{generate_id, SessionRecord};
use crate::storage::Storage;

pub const SESSION_COOKIE: &str = "session_token";

const SESSION_LENGTH_SECS: i64 = 7 * 24 * 60 * 60; // 7 days

#[derive(Clone)]
pub struct SessionService {
    storage: Arc<dyn Storage>,
}

impl SessionService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Create a new session for `user_id` and persist it.
    pub async fn create(&self, user_id: &str) -> Result<SessionRecord> {
        let session = SessionRecord {
            session_id: generate_id(),
            user_id: user_id.to_string(),
            expires_at: Utc::now().timestamp() + SESSION_LENGTH_SECS,
        };
        self.storage
            .create_session(&session.session_id, &session.user_id, session.expires_at)
            .await?;
        Ok(session)
    }

    /// Whether `session_id` names a live session. Storage failures log and
    /// count as invalid.
    pub async fn is_valid(&self, session_id: &str) -> bool {
        match self.user_for(session_id).await {
            Ok(user) => user.is_some(),
            Err(err) => {
                error!(error = %err, "error retrieving session");
                false
            }
        }
    }

    /// The user id behind a live (unexpired) session.
    pub async fn user_for(&self, session_id: &str) -> Result<Option<String>> {
        let Some(session) = self.storage.get_session(session_id).await? else {
            return Ok(None);
        };
        if session.expires_at < Utc::now().timestamp() {
            return Ok(None);
        }
        Ok(Some(session.user_id))
    }

    /// True until the first user account exists. While onboarding, the
    /// private routes are reachable without a session.
    pub async fn first_run(&self) -> Result<bool> {
        Ok(!self.storage.has_users().await?)
    }

    /// Delete expired sessions; returns how many were removed.
    pub async fn sweep_expired(&self) -> Result<u64> {
        self.storage
            .delete_expired_sessions(Utc::now().timestamp())
            .await
    }

    /// Set-Cookie value for a session.
    pub fn cookie_for(session: &SessionRecord) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE, session.session_id, SESSION_LENGTH_SECS
        )
    }

    /// Pull the session id out of a request's Cookie header, if present.
    pub fn session_id_from(headers: &HeaderMap) -> Option<String> {
        let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
        for part in cookies.split(';') {
            if let Some((name, value)) = part.trim().split_once('=') {
                if name == SESSION_COOKIE {
                    return Some(value.to_string());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_id_parsed_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_token=abc123; lang=en"),
        );
        assert_eq!(
            SessionService::session_id_from(&headers),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn missing_cookie_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(SessionService::session_id_from(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(SessionService::session_id_from(&headers), None);
    }

    #[test]
    fn cookie_value_carries_session_attributes() {
        let session = SessionRecord {
            session_id: "abc123".to_string(),
            user_id: "u1".to_string(),
            expires_at: 0,
        };
        let cookie = SessionService::cookie_for(&session);
        assert!(cookie.starts_with("session_token=abc123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
    }
}
