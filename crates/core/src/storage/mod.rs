//! Catalog storage.
//!
//! The production catalog lives in a hosted database reached through the
//! server's backends; [`MemoryCatalog`] keeps a snapshot in memory for local
//! runs and tests.

/// In-memory catalog with brute-force cosine search.
pub mod memory;

pub use memory::{cosine_similarity, MemoryCatalog};
