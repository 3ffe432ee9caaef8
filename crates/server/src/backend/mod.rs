//! Catalog database collaborators.
//!
//! [`CatalogBackend`] is the seam between the search service and wherever the
//! book catalog lives: an in-process [`MemoryBackend`] loaded from a JSON file,
//! or a hosted PostgREST database via [`RestBackend`].

/// In-process catalog backed by `bookfinder_core::storage::MemoryCatalog`.
pub mod memory;
/// PostgREST-style hosted catalog database.
pub mod rest;

pub use memory::MemoryBackend;
pub use rest::RestBackend;

use async_trait::async_trait;
use bookfinder_core::catalog::{CatalogEntry, Neighbor};
use bookfinder_core::error::CatalogError;
use bookfinder_core::search::KeywordFilter;
use std::time::Duration;
use thiserror::Error;

/// Failure of a catalog query. Always surfaced to the caller as a 500.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("catalog request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("catalog database returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed catalog response: {0}")]
    MalformedResponse(String),
    #[error("catalog query rejected: {0}")]
    Catalog(#[from] CatalogError),
    #[error("{branch} query timed out after {after:?}")]
    Timeout {
        branch: &'static str,
        after: Duration,
    },
    #[error("{branch} task failed: {message}")]
    Task {
        branch: &'static str,
        message: String,
    },
}

/// The two catalog queries the hybrid search needs.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Short backend label reported by `/health`.
    fn name(&self) -> &'static str;

    /// Entries with cosine similarity strictly above `threshold`, highest first.
    async fn nearest_neighbors(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<Neighbor>, BackendError>;

    /// Entries matching the disjunctive substring filter, at most `limit`.
    async fn keyword_filter(
        &self,
        filter: &KeywordFilter,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>, BackendError>;

    /// Number of catalog entries, when cheaply known.
    fn entry_count(&self) -> Option<usize> {
        None
    }
}
