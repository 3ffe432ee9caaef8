//! HTTP request handlers and shared application state.

use crate::api::audit::{audit_event, AuditContext};
use crate::api::errors::ApiError;
use crate::api::metrics;
use crate::api::models::*;
use crate::auth::TokenValidator;
use crate::service::{SearchOutcome, SearchService};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use bookfinder_core::search::fallback::fallback_results;
use bookfinder_core::search::normalize_query;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state passed to every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
    pub validator: Arc<dyn TokenValidator>,
    pub prometheus_handle: PrometheusHandle,
    pub start_time: Instant,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let backend = state.service.backend();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
            catalog_backend: backend.name().to_string(),
            catalog_entries: backend.entry_count(),
        }),
    )
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.prometheus_handle.render()
}

/// `POST /search`: hybrid vector + keyword book search.
pub async fn search(
    State(state): State<AppState>,
    audit_ctx: Option<Extension<AuditContext>>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(req) = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(e.body_text())
        } else {
            ApiError::BadRequest(e.body_text())
        }
    })?;
    let raw = req
        .query
        .ok_or_else(|| ApiError::BadRequest("Query is required".to_string()))?;
    let query = normalize_query(&raw)?;

    let outcome = match state.service.search(query).await {
        Ok(outcome) => outcome,
        Err(e) => {
            metrics::record_search("backend_error");
            if let Some(Extension(ref ctx)) = audit_ctx {
                audit_event(ctx, "search", &format!("query={}", query), "backend_error");
            }
            return Err(e.into());
        }
    };

    let timestamp = chrono::Utc::now().to_rfc3339();
    let response = match outcome {
        SearchOutcome::Ranked {
            results,
            plan,
            counts,
        } => SearchResponse {
            debug: DebugInfo {
                original_query: plan.original,
                enhanced_query: plan.enhanced.text,
                enhancement: plan.enhanced.kind,
                embedding_results: counts.embedding_results,
                keyword_results: counts.keyword_results,
                total_results: results.len(),
                similarity_threshold: plan.threshold,
                timestamp,
                fallback: false,
                error: None,
            },
            books: results,
        },
        SearchOutcome::Fallback { plan, error } => {
            let books = fallback_results();
            SearchResponse {
                debug: DebugInfo {
                    original_query: plan.original,
                    enhanced_query: plan.enhanced.text,
                    enhancement: plan.enhanced.kind,
                    embedding_results: 0,
                    keyword_results: 0,
                    total_results: books.len(),
                    similarity_threshold: plan.threshold,
                    timestamp,
                    fallback: true,
                    error: Some(error.to_string()),
                },
                books,
            }
        }
    };

    let outcome = if response.debug.fallback {
        "fallback"
    } else {
        "ranked"
    };
    metrics::record_search(outcome);
    if let Some(Extension(ref ctx)) = audit_ctx {
        audit_event(
            ctx,
            "search",
            &format!(
                "query={} results={}",
                response.debug.original_query, response.debug.total_results
            ),
            outcome,
        );
    }

    Ok(Json(response))
}
