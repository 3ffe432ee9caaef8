//! bookfinder-server — HTTP server for the school library book search.
//!
//! Provides the REST API and the async collaborators of a hybrid search:
//! embedding provider, catalog database, and identity service.
//! Query planning and ranking live in `bookfinder-core`.

/// REST API layer: Axum router, HTTP handlers, models, auth middleware, metrics.
pub mod api;
/// Bearer-token validation.
pub mod auth;
/// Catalog database backends.
pub mod backend;
/// Embedding provider client.
pub mod embedding;
/// Hybrid search orchestration.
pub mod service;
