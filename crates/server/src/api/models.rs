//! Request and response data transfer objects for the REST API.
//!
//! All types derive `Serialize` and/or `Deserialize` for JSON marshalling via Axum.

use bookfinder_core::catalog::ScoredResult;
use bookfinder_core::search::EnhancementKind;
use serde::{Deserialize, Serialize};

/// Request body for `POST /search`.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Free-text query; required and non-blank.
    #[serde(default)]
    pub query: Option<String>,
}

/// Response body for `POST /search`.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub books: Vec<ScoredResult>,
    pub debug: DebugInfo,
}

/// Diagnostics returned with every search response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub original_query: String,
    pub enhanced_query: String,
    pub enhancement: EnhancementKind,
    pub embedding_results: usize,
    pub keyword_results: usize,
    pub total_results: usize,
    pub similarity_threshold: f32,
    /// RFC 3339 time the response was built.
    pub timestamp: String,
    /// True when `books` is the placeholder set served during an embedding outage.
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub catalog_backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_entries: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_request_query_optional() {
        let req: SearchRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.query.is_none());
        let req: SearchRequest = serde_json::from_value(json!({ "query": "Faust" })).unwrap();
        assert_eq!(req.query.as_deref(), Some("Faust"));
    }

    #[test]
    fn test_debug_info_field_names() {
        let debug = DebugInfo {
            original_query: "ab".into(),
            enhanced_query: "Buch über ab".into(),
            enhancement: EnhancementKind::BookContext,
            embedding_results: 2,
            keyword_results: 0,
            total_results: 2,
            similarity_threshold: 0.4,
            timestamp: "2024-01-01T00:00:00+00:00".into(),
            fallback: false,
            error: None,
        };
        let value = serde_json::to_value(&debug).unwrap();
        for key in [
            "originalQuery",
            "enhancedQuery",
            "embeddingResults",
            "keywordResults",
            "totalResults",
            "similarityThreshold",
            "timestamp",
            "fallback",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert!(value.get("error").is_none());
        assert_eq!(value["enhancement"], "book_context");
    }
}
