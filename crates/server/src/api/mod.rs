//! REST API layer built on Axum.
//!
//! Exposes the authenticated `POST /search` endpoint plus unauthenticated
//! `/health` and `/metrics`. Includes middleware for authentication, rate
//! limiting, request timeouts, body size limits, panic recovery, metrics
//! collection, and request ID tracing.

/// Structured audit logging for searches.
pub mod audit;
/// API error types mapped to HTTP status codes.
pub mod errors;
/// HTTP request handlers and application state.
pub mod handlers;
/// Prometheus metrics recording.
pub mod metrics;
/// Request and response data transfer objects.
pub mod models;

use audit::{extract_client_ip, mask_token, AuditContext};
use axum::error_handling::HandleErrorLayer;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Router};
use bookfinder_core::config;
use errors::ApiError;
use handlers::AppState;
use std::time::{Duration, Instant};
use tower::buffer::BufferLayer;
use tower::limit::{ConcurrencyLimitLayer, RateLimitLayer};
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

/// Token from an `Authorization: Bearer <token>` value. The scheme is
/// case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

async fn auth_middleware(
    State(state): State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, ApiError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string)
        .ok_or_else(|| ApiError::Unauthorized("Missing or invalid authorization header".into()))?;

    let identity = state.validator.validate(&token).await.map_err(|e| {
        tracing::info!(error = %e, token = %mask_token(&token), "Authentication rejected");
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })?;

    let ctx = AuditContext {
        actor: identity.user_id.clone(),
        token_prefix: mask_token(&token),
        client_ip: extract_client_ip(&req),
    };
    req.extensions_mut().insert(identity);
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

async fn request_id_middleware(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("request", request_id = %request_id);
    async move {
        let mut response = next.run(req).await;
        if let Ok(value) = axum::http::HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(axum::http::HeaderName::from_static("x-request-id"), value);
        }
        response
    }
    .instrument(span)
    .await
}

async fn security_headers_middleware(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        axum::http::HeaderName::from_static("x-content-type-options"),
        axum::http::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        axum::http::HeaderName::from_static("x-frame-options"),
        axum::http::HeaderValue::from_static("DENY"),
    );
    headers.insert(
        axum::http::HeaderName::from_static("referrer-policy"),
        axum::http::HeaderValue::from_static("no-referrer"),
    );
    response
}

async fn metrics_middleware(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(req).await;
    metrics::record_request(&method, &path, response.status().as_u16(), start.elapsed());
    response
}

/// Request timeout for a given per-branch timeout.
///
/// The vector branch runs the embedding and the nearest-neighbor query back to
/// back, and remote token validation runs before either. The request timeout
/// outlasts all three, so an embedding timeout still ends in the fallback.
pub fn request_timeout(branch_timeout: Duration) -> Duration {
    let needed = branch_timeout * 2 + Duration::from_secs(config::AUTH_TIMEOUT_SECS + 1);
    needed.max(Duration::from_secs(config::REQUEST_TIMEOUT_SECS))
}

/// Renders errors from the tower limit and timeout layers.
fn middleware_error_response(err: tower::BoxError) -> axum::response::Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("Request timed out");
        ApiError::RequestTimeout("Request timed out".into()).into_response()
    } else {
        ApiError::TooManyRequests("Too many requests".into()).into_response()
    }
}

/// Builds the Axum router with all routes and middleware layers.
///
/// The middleware stack (outermost to innermost):
/// Rate limiting → Concurrency limit → Timeout → Body limit → CORS →
/// Catch panic → Trace → Security headers → Request ID → Metrics → Auth.
///
/// CORS is permissive (any origin) so browser preflights for `/search` succeed.
pub fn create_router(state: AppState) -> Router {
    let timeout = request_timeout(state.service.branch_timeout());
    let protected = Router::new()
        .route("/search", post(handlers::search))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_endpoint))
        .merge(protected)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(errors::panic_response))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(config::MAX_REQUEST_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|err: tower::BoxError| async move {
                    middleware_error_response(err)
                }))
                .layer(BufferLayer::new(1024))
                .layer(ConcurrencyLimitLayer::new(config::MAX_CONCURRENT_REQUESTS))
                .layer(RateLimitLayer::new(
                    config::RATE_LIMIT_RPS,
                    Duration::from_secs(1),
                ))
                .layer(TimeoutLayer::new(timeout)),
        )
        .with_state(state)
}
