//! In-memory catalog with brute-force cosine nearest-neighbor search.
//!
//! Serves as the catalog database when no hosted database is configured, and
//! as the reference implementation of the two catalog queries: nearest
//! neighbors above a similarity threshold, and the disjunctive keyword filter.
//! Entries are loaded once from a JSON array and shared behind a `RwLock`.

use crate::catalog::{CatalogEntry, Neighbor};
use crate::error::CatalogError;
use crate::search::filter::KeywordFilter;
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::Path;
use std::sync::Arc;

/// Internal data of a catalog, protected by a `RwLock`.
#[derive(Debug, Default)]
struct CatalogData {
    entries: Vec<CatalogEntry>,
    /// Dimension shared by all stored embeddings; `None` until the first one is seen.
    dimension: Option<usize>,
}

impl CatalogData {
    fn check_embedding(&mut self, entry: &CatalogEntry) -> Result<(), CatalogError> {
        let Some(embedding) = entry.embedding.as_ref() else {
            return Ok(());
        };
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(CatalogError::InvalidEmbedding {
                id: entry.id.to_string(),
            });
        }
        match self.dimension {
            Some(expected) if expected != embedding.len() => Err(CatalogError::DimensionMismatch {
                id: entry.id.to_string(),
                expected,
                got: embedding.len(),
            }),
            Some(_) => Ok(()),
            None => {
                self.dimension = Some(embedding.len());
                Ok(())
            }
        }
    }
}

/// Thread-safe in-memory catalog. Cloning yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    data: Arc<RwLock<CatalogData>>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog, rejecting entries whose embedding dimension disagrees
    /// with the first embedding seen.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let catalog = Self::new();
        for entry in entries {
            catalog.insert(entry)?;
        }
        Ok(catalog)
    }

    /// Loads a catalog from a JSON file holding an array of entries.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let path_str = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|source| CatalogError::Io {
            path: path_str.clone(),
            source,
        })?;
        let entries: Vec<CatalogEntry> =
            serde_json::from_slice(&bytes).map_err(|source| CatalogError::Parse {
                path: path_str.clone(),
                source,
            })?;
        let catalog = Self::from_entries(entries)?;
        tracing::info!(
            path = %path_str,
            entries = catalog.len(),
            dimension = ?catalog.dimension(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Appends an entry.
    pub fn insert(&self, entry: CatalogEntry) -> Result<(), CatalogError> {
        let mut data = self.data.write();
        data.check_embedding(&entry)?;
        data.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().entries.is_empty()
    }

    /// Embedding dimension of the catalog, if any entry has an embedding.
    pub fn dimension(&self) -> Option<usize> {
        self.data.read().dimension
    }

    /// Entries whose cosine similarity to `query` is strictly above `threshold`,
    /// highest first, at most `limit`. Entries without an embedding never match.
    pub fn nearest_neighbors(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<Neighbor>, CatalogError> {
        let data = self.data.read();
        if let Some(expected) = data.dimension {
            if expected != query.len() {
                return Err(CatalogError::DimensionMismatch {
                    id: "<query>".to_string(),
                    expected,
                    got: query.len(),
                });
            }
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        // Partial sort: O(n log k) via min-heap of size k. Ties prefer catalog order.
        let mut heap: BinaryHeap<Reverse<(OrderedFloat<f32>, Reverse<usize>)>> =
            BinaryHeap::with_capacity(limit + 1);
        for (idx, entry) in data.entries.iter().enumerate() {
            let Some(embedding) = entry.embedding.as_deref() else {
                continue;
            };
            let similarity = cosine_similarity(query, embedding);
            if similarity <= threshold {
                continue;
            }
            heap.push(Reverse((OrderedFloat(similarity), Reverse(idx))));
            if heap.len() > limit {
                heap.pop();
            }
        }

        let mut ranked: Vec<(f32, usize)> = heap
            .into_iter()
            .map(|Reverse((s, Reverse(idx)))| (s.0, idx))
            .collect();
        ranked.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        Ok(ranked
            .into_iter()
            .map(|(similarity, idx)| Neighbor {
                entry: data.entries[idx].clone(),
                similarity,
            })
            .collect())
    }

    /// Entries matching the keyword filter, in catalog order, at most `limit`.
    pub fn keyword_search(&self, filter: &KeywordFilter, limit: usize) -> Vec<CatalogEntry> {
        if filter.is_empty() {
            return Vec::new();
        }
        self.data
            .read()
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Cosine similarity of two equal-length vectors; 0.0 when either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    dot / denom
}
