//! Catalog stored in a hosted Postgres database exposed through PostgREST.
//!
//! Vector search goes through a `match_books` RPC (pgvector cosine match);
//! keyword search is a plain table read with an `or=(... ilike ...)` filter.

use super::{BackendError, CatalogBackend};
use crate::embedding::truncate;
use async_trait::async_trait;
use bookfinder_core::catalog::{CatalogEntry, Neighbor};
use bookfinder_core::search::KeywordFilter;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Columns read by keyword search; embeddings are never fetched.
const SELECT_COLUMNS: &str = "id,title,author,subject,level,type,publisher,description";

const DEFAULT_TABLE: &str = "books";
const DEFAULT_MATCH_FUNCTION: &str = "match_books";

#[derive(Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_threshold: f32,
    match_count: usize,
}

/// PostgREST client for the book catalog.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    service_key: Option<String>,
    table: String,
    match_function: String,
}

impl RestBackend {
    pub fn new(base_url: impl Into<String>, service_key: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, service_key)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        service_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key,
            table: DEFAULT_TABLE.to_string(),
            match_function: DEFAULT_MATCH_FUNCTION.to_string(),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.service_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }
        let bytes = response.bytes().await.map_err(BackendError::Transport)?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl CatalogBackend for RestBackend {
    fn name(&self) -> &'static str {
        "postgrest"
    }

    async fn nearest_neighbors(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<Neighbor>, BackendError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, self.match_function);
        let request = self.client.post(url).json(&MatchRequest {
            query_embedding: embedding,
            match_threshold: threshold,
            match_count: limit,
        });
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(BackendError::Transport)?;
        let mut neighbors: Vec<Neighbor> = Self::read_json(response).await?;
        // The RPC is trusted for ordering but not for the strict threshold or the cap.
        neighbors.retain(|n| n.similarity > threshold);
        neighbors.truncate(limit);
        Ok(neighbors)
    }

    async fn keyword_filter(
        &self,
        filter: &KeywordFilter,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>, BackendError> {
        let Some(or) = filter.to_postgrest_or() else {
            return Ok(Vec::new());
        };
        let url = format!("{}/rest/v1/{}", self.base_url, self.table);
        let limit = limit.to_string();
        let request = self.client.get(url).query(&[
            ("select", SELECT_COLUMNS),
            ("or", or.as_str()),
            ("limit", limit.as_str()),
        ]);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(BackendError::Transport)?;
        Self::read_json(response).await
    }
}
