//! API error types mapped to HTTP status codes.
//!
//! Each [`ApiError`] variant maps to a specific HTTP status code and produces
//! a JSON response body `{"error": "message"}`. Server errors additionally carry
//! `details` (the error's source chain) and a `timestamp` for diagnostics.

use crate::backend::BackendError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bookfinder_core::error::QueryError;
use serde_json::json;
use std::any::Any;
use std::error::Error as StdError;

/// Application-level error type that implements `IntoResponse`.
///
/// Each variant maps to an HTTP status code:
/// - `BadRequest` → 400
/// - `Unauthorized` → 401
/// - `RequestTimeout` → 408
/// - `PayloadTooLarge` → 413
/// - `TooManyRequests` → 429
/// - `Internal` → 500
#[derive(Debug)]
pub enum ApiError {
    /// Invalid or missing request body / query (400).
    BadRequest(String),
    /// Missing or rejected bearer token (401).
    Unauthorized(String),
    /// The request outlived the router's request timeout (408).
    RequestTimeout(String),
    /// Request body over the configured limit (413).
    PayloadTooLarge(String),
    /// Rate limit exceeded (429).
    TooManyRequests(String),
    /// Backend failure or unexpected server error (500).
    Internal {
        message: String,
        details: Option<String>,
    },
}

impl ApiError {
    /// Internal error whose `details` is the full source chain of `err`.
    pub fn internal(message: impl Into<String>, err: &(dyn StdError + 'static)) -> Self {
        ApiError::Internal {
            message: message.into(),
            details: Some(error_chain(err)),
        }
    }
}

/// Renders an error and its sources as `outer: inner: root`.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        ApiError::internal("Search backend error", &err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ApiError::RequestTimeout(msg) => (
                StatusCode::REQUEST_TIMEOUT,
                json!({ "error": msg, "timestamp": timestamp() }),
            ),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": msg }))
            }
            ApiError::TooManyRequests(msg) => {
                (StatusCode::TOO_MANY_REQUESTS, json!({ "error": msg }))
            }
            ApiError::Internal { message, details } => {
                let mut body = json!({ "error": message, "timestamp": timestamp() });
                if let Some(details) = details {
                    body["details"] = json!(details);
                }
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };
        (status, axum::Json(body)).into_response()
    }
}

/// Converts a handler panic into the 500 error shape.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(details = %details, "Handler panicked");
    ApiError::Internal {
        message: "Unexpected server error".into(),
        details: Some(details),
    }
    .into_response()
}
