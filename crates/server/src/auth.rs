//! Bearer-token authentication.
//!
//! The HTTP layer asks a [`TokenValidator`] to turn a bearer token into an
//! [`Identity`]. Two validators ship: [`StaticTokenValidator`], backed by a fixed
//! token table from the environment, and [`RemoteTokenValidator`], which defers
//! to a hosted identity service.

use async_trait::async_trait;
use bookfinder_core::config;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("identity service unreachable: {0}")]
    Transport(#[source] reqwest::Error),
}

#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<Identity, AuthError>;
}

/// A single entry of the static token table.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    /// The bearer token string.
    pub token: String,
    /// User id reported for requests carrying this token.
    pub user_id: String,
}

/// Validator over a fixed token → user id table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, String>,
}

impl StaticTokenValidator {
    pub fn from_entries(entries: Vec<TokenEntry>) -> Self {
        Self {
            tokens: entries.into_iter().map(|e| (e.token, e.user_id)).collect(),
        }
    }

    /// Parses the JSON array form used by `BOOKFINDER_API_TOKENS`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Vec<TokenEntry>>(json).map(Self::from_entries)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        self.tokens
            .get(token)
            .map(|user_id| Identity {
                user_id: user_id.clone(),
            })
            .ok_or_else(|| AuthError::Rejected("unknown token".into()))
    }
}

#[derive(Deserialize)]
struct RemoteUser {
    id: Option<String>,
}

/// Validator that asks a hosted identity service (`GET {base}/auth/v1/user`).
#[derive(Debug, Clone)]
pub struct RemoteTokenValidator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl RemoteTokenValidator {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_secs(config::AUTH_TIMEOUT_SECS),
        }
    }

    /// Overrides the per-call timeout (default `AUTH_TIMEOUT_SECS`).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TokenValidator for RemoteTokenValidator {
    async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        let mut request = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .timeout(self.timeout)
            .bearer_auth(token);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        let response = request.send().await.map_err(AuthError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected(format!(
                "identity service returned {}",
                status.as_u16()
            )));
        }
        let user: RemoteUser = response
            .json()
            .await
            .map_err(|e| AuthError::Rejected(format!("unreadable identity response: {}", e)))?;
        match user.id {
            Some(user_id) if !user_id.is_empty() => Ok(Identity { user_id }),
            _ => Err(AuthError::Rejected("identity response has no user id".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    #[tokio::test]
    async fn test_static_validator() {
        let validator = StaticTokenValidator::from_json(
            r#"[{"token": "t-librarian", "user_id": "u1"}, {"token": "t-student", "user_id": "u2"}]"#,
        )
        .unwrap();
        assert_eq!(validator.len(), 2);
        assert_eq!(
            validator.validate("t-student").await.unwrap(),
            Identity {
                user_id: "u2".into()
            }
        );
        assert!(matches!(
            validator.validate("nope").await,
            Err(AuthError::Rejected(_))
        ));
        assert!(matches!(validator.validate("").await, Err(AuthError::Missing)));
    }

    #[test]
    fn test_static_validator_invalid_json() {
        assert!(StaticTokenValidator::from_json("{not json").is_err());
        assert!(StaticTokenValidator::from_json("[]").unwrap().is_empty());
    }

    async fn spawn_identity_service() -> String {
        let router = Router::new().route(
            "/auth/v1/user",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                let apikey = headers
                    .get("apikey")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                if apikey != "anon-key" {
                    return StatusCode::FORBIDDEN.into_response();
                }
                if auth == "Bearer slow" {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
                match auth {
                    "Bearer good" => Json(json!({ "id": "user-42", "email": "a@b.c" })).into_response(),
                    "Bearer anonymous" => Json(json!({ "email": "a@b.c" })).into_response(),
                    _ => StatusCode::UNAUTHORIZED.into_response(),
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_remote_validator() {
        let base = spawn_identity_service().await;
        let validator = RemoteTokenValidator::new(base.clone(), Some("anon-key".into()));

        let identity = validator.validate("good").await.unwrap();
        assert_eq!(identity.user_id, "user-42");

        assert!(matches!(
            validator.validate("bad").await,
            Err(AuthError::Rejected(_))
        ));
        assert!(matches!(
            validator.validate("anonymous").await,
            Err(AuthError::Rejected(_))
        ));

        let wrong_key = RemoteTokenValidator::new(base, Some("other".into()));
        assert!(wrong_key.validate("good").await.is_err());
    }

    #[tokio::test]
    async fn test_remote_validator_times_out() {
        let base = spawn_identity_service().await;
        let validator = RemoteTokenValidator::new(base, Some("anon-key".into()))
            .with_timeout(Duration::from_millis(100));

        let started = std::time::Instant::now();
        match validator.validate("slow").await {
            Err(AuthError::Transport(e)) => assert!(e.is_timeout()),
            other => panic!("expected transport timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_remote_validator_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let validator = RemoteTokenValidator::new(format!("http://{}", addr), None);
        assert!(matches!(
            validator.validate("good").await,
            Err(AuthError::Transport(_))
        ));
    }
}
