//! Embedding provider client.
//!
//! The search service only sees the [`Embedder`] trait. [`HttpEmbedder`] talks to
//! any OpenAI-compatible `/embeddings` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Longest upstream error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("embedding provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),
    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),
}

/// Turns text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Model identifier sent with every request.
    fn model(&self) -> &str;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbedder {
    pub fn new(url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url, model, api_key)
    }

    pub fn with_client(
        client: reqwest::Client,
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut request = self.client.post(&self.url).json(&EmbeddingRequest {
            input: text,
            model: &self.model,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(EmbeddingError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let bytes = response.bytes().await.map_err(EmbeddingError::Transport)?;
        let parsed: EmbeddingResponse = serde_json::from_slice(&bytes)
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .unwrap_or_default();
        if embedding.is_empty() {
            return Err(EmbeddingError::MalformedResponse(
                "response contains no embedding vector".into(),
            ));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(EmbeddingError::MalformedResponse(
                "embedding contains non-finite values".into(),
            ));
        }
        tracing::debug!(model = %self.model, dimension = embedding.len(), "Embedding received");
        Ok(embedding)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

pub(crate) fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let mut out: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1/embeddings", addr)
    }

    #[tokio::test]
    async fn test_embed_sends_model_and_key() {
        let seen: Arc<Mutex<Option<(Value, String)>>> = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let router = Router::new().route(
            "/v1/embeddings",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let captured = captured.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *captured.lock().unwrap() = Some((body, auth));
                    Json(json!({ "data": [{ "embedding": [0.1, 0.2, 0.3] }] }))
                }
            }),
        );
        let url = spawn_upstream(router).await;
        let embedder = HttpEmbedder::new(url, "text-embedding-3-small", Some("sk-test".into()));

        let vector = embedder.embed("Buch über Faust").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);

        let (body, auth) = seen.lock().unwrap().take().unwrap();
        assert_eq!(body["input"], "Buch über Faust");
        assert_eq!(body["model"], "text-embedding-3-small");
        assert_eq!(auth, "Bearer sk-test");
    }

    #[tokio::test]
    async fn test_embed_status_error() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
        );
        let url = spawn_upstream(router).await;
        let embedder = HttpEmbedder::new(url, "m", None);

        match embedder.embed("x").await {
            Err(EmbeddingError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream down");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_embed_missing_vector() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async { Json(json!({ "data": [] })) }),
        );
        let url = spawn_upstream(router).await;
        let embedder = HttpEmbedder::new(url, "m", None);
        assert!(matches!(
            embedder.embed("x").await,
            Err(EmbeddingError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_non_json_body() {
        let router = Router::new().route("/v1/embeddings", post(|| async { "not json" }));
        let url = spawn_upstream(router).await;
        let embedder = HttpEmbedder::new(url, "m", None);
        assert!(matches!(
            embedder.embed("x").await,
            Err(EmbeddingError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let embedder = HttpEmbedder::new(format!("http://{}/v1/embeddings", addr), "m", None);
        assert!(matches!(
            embedder.embed("x").await,
            Err(EmbeddingError::Transport(_))
        ));
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(MAX_ERROR_BODY_CHARS + 10);
        let out = truncate(&body);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), MAX_ERROR_BODY_CHARS + 3);
        assert_eq!(truncate("short"), "short");
    }
}
