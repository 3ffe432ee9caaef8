use super::{BackendError, CatalogBackend};
use async_trait::async_trait;
use bookfinder_core::catalog::{CatalogEntry, Neighbor};
use bookfinder_core::error::CatalogError;
use bookfinder_core::search::KeywordFilter;
use bookfinder_core::storage::MemoryCatalog;
use std::path::Path;

/// Catalog held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    catalog: MemoryCatalog,
}

impl MemoryBackend {
    pub fn new(catalog: MemoryCatalog) -> Self {
        Self { catalog }
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        MemoryCatalog::load(path).map(Self::new)
    }

    pub fn catalog(&self) -> &MemoryCatalog {
        &self.catalog
    }
}

#[async_trait]
impl CatalogBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn nearest_neighbors(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<Neighbor>, BackendError> {
        Ok(self.catalog.nearest_neighbors(embedding, threshold, limit)?)
    }

    async fn keyword_filter(
        &self,
        filter: &KeywordFilter,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>, BackendError> {
        Ok(self.catalog.keyword_search(filter, limit))
    }

    fn entry_count(&self) -> Option<usize> {
        Some(self.catalog.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> MemoryBackend {
        let entries = vec![
            CatalogEntry {
                title: Some("Physik heute".into()),
                embedding: Some(vec![1.0, 0.0]),
                ..CatalogEntry::with_id("p")
            },
            CatalogEntry {
                title: Some("Chemie heute".into()),
                embedding: Some(vec![0.0, 1.0]),
                ..CatalogEntry::with_id("c")
            },
        ];
        MemoryBackend::new(MemoryCatalog::from_entries(entries).unwrap())
    }

    #[tokio::test]
    async fn test_nearest_neighbors() {
        let hits = backend().nearest_neighbors(&[1.0, 0.1], 0.5, 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id.as_str(), "p");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_backend_error() {
        let err = backend()
            .nearest_neighbors(&[1.0, 0.0, 0.0], 0.5, 20)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Catalog(CatalogError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn test_keyword_filter() {
        let filter = KeywordFilter::new(&["heute".to_string()]);
        let hits = backend().keyword_filter(&filter, 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "p");
    }

    #[test]
    fn test_entry_count() {
        let b = backend();
        assert_eq!(b.entry_count(), Some(2));
        assert_eq!(b.name(), "memory");
    }
}
