//! Error types for the search core.

use std::io;
use thiserror::Error;

/// Rejection of a search query before any backend is contacted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query must not be empty")]
    Empty,
    #[error("Query exceeds maximum length of {max} bytes")]
    TooLong { max: usize },
}

/// Failure to load a catalog snapshot into memory.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid catalog JSON in '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("entry '{id}' has embedding dimension {got}, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        got: usize,
    },
    #[error("entry '{id}' embedding contains NaN or Inf")]
    InvalidEmbedding { id: String },
}
