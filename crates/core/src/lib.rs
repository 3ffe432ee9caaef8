//! # bookfinder-core
//!
//! Hybrid book search engine for a school library catalog: combines a
//! vector-similarity search with a keyword search, then merges and re-ranks
//! both result sets with a domain-weighted keyword score.
//!
//! This is the core library crate with zero async dependencies. Network
//! collaborators (embedding provider, hosted catalog database, identity
//! service) live in `bookfinder-server`.
//!
//! ## Architecture
//!
//! ```text
//! query → SearchPlan { enhance, tokenize, weigh, threshold }
//!       → { embed → nearest neighbors } ∥ { keyword filter }
//!       → Ranker::merge → ranked ScoredResult list
//! ```

/// Catalog data model: entries, ids, neighbors, and scored results.
pub mod catalog;
/// Global configuration constants: thresholds, ranking weights, limits, and defaults.
pub mod config;
/// Error types for query validation and catalog loading.
pub mod error;
/// Search planning, query enhancement, keyword weighting, ranking, and fallback results.
pub mod search;
/// In-memory catalog storage.
pub mod storage;
