//! Hybrid search orchestration.
//!
//! A request is planned synchronously, then the vector branch (embed, then
//! nearest neighbors) and the keyword branch (substring filter) run as two
//! spawned tasks. Both are joined before the merge, and both are aborted if the
//! request is dropped first. An embedding failure degrades to the fallback
//! result set; any catalog failure is an error.

use crate::api::metrics;
use crate::backend::{BackendError, CatalogBackend};
use crate::embedding::{Embedder, EmbeddingError};
use bookfinder_core::catalog::{CatalogEntry, Neighbor, ScoredResult};
use bookfinder_core::config;
use bookfinder_core::search::enhancer::TemplatePicker;
use bookfinder_core::search::{KeywordFilter, KeywordTable, QueryEnhancer, Ranker, SearchPlan};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};

/// Number of rows each branch returned before merging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BranchCounts {
    pub embedding_results: usize,
    pub keyword_results: usize,
}

#[derive(Debug)]
pub enum SearchOutcome {
    /// Both branches succeeded; results are merged and sorted.
    Ranked {
        results: Vec<ScoredResult>,
        plan: SearchPlan,
        counts: BranchCounts,
    },
    /// The embedding provider failed or timed out.
    Fallback {
        plan: SearchPlan,
        error: EmbeddingError,
    },
}

impl SearchOutcome {
    pub fn plan(&self) -> &SearchPlan {
        match self {
            SearchOutcome::Ranked { plan, .. } | SearchOutcome::Fallback { plan, .. } => plan,
        }
    }
}

enum VectorFailure {
    Embedding(EmbeddingError),
    Backend(BackendError),
}

pub struct SearchService {
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn CatalogBackend>,
    table: Arc<KeywordTable>,
    enhancer: QueryEnhancer,
    ranker: Ranker,
    branch_timeout: Duration,
    vector_limit: usize,
    keyword_limit: usize,
}

impl SearchService {
    pub fn new(embedder: Arc<dyn Embedder>, backend: Arc<dyn CatalogBackend>) -> Self {
        Self::with_table(embedder, backend, Arc::new(KeywordTable::default()))
    }

    pub fn with_table(
        embedder: Arc<dyn Embedder>,
        backend: Arc<dyn CatalogBackend>,
        table: Arc<KeywordTable>,
    ) -> Self {
        Self {
            embedder,
            backend,
            enhancer: QueryEnhancer::new(table.clone()),
            ranker: Ranker::new(table.clone()),
            table,
            branch_timeout: Duration::from_secs(config::DEFAULT_BRANCH_TIMEOUT_SECS),
            vector_limit: config::VECTOR_MATCH_COUNT,
            keyword_limit: config::KEYWORD_MATCH_COUNT,
        }
    }

    /// Replaces the enhancer's template picker.
    pub fn with_picker(mut self, picker: Box<dyn TemplatePicker>) -> Self {
        self.enhancer = QueryEnhancer::with_picker(self.table.clone(), picker);
        self
    }

    pub fn with_branch_timeout(mut self, timeout: Duration) -> Self {
        self.branch_timeout = timeout;
        self
    }

    pub fn branch_timeout(&self) -> Duration {
        self.branch_timeout
    }

    pub fn backend(&self) -> &dyn CatalogBackend {
        self.backend.as_ref()
    }

    pub fn plan(&self, query: &str) -> SearchPlan {
        SearchPlan::new(query, &self.enhancer, &self.ranker)
    }

    /// Runs a hybrid search for a query already passed through `normalize_query`.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, BackendError> {
        let plan = self.plan(query);
        tracing::info!(
            query = %plan.original,
            enhanced = %plan.enhanced.text,
            enhancement = ?plan.enhanced.kind,
            tokens = plan.token_count,
            threshold = plan.threshold,
            keywords = plan.keywords.len(),
            "Search planned"
        );

        let vector_task = BranchTask::spawn(vector_branch(
            self.embedder.clone(),
            self.backend.clone(),
            plan.enhanced.text.clone(),
            plan.threshold,
            self.vector_limit,
            self.branch_timeout,
        ));
        let keyword_task = BranchTask::spawn(keyword_branch(
            self.backend.clone(),
            plan.filter.clone(),
            self.keyword_limit,
            self.branch_timeout,
        ));
        let (vector, keyword) = tokio::join!(vector_task, keyword_task);

        let neighbors = match vector.map_err(|e| task_failed("vector", e))? {
            Ok(neighbors) => neighbors,
            Err(VectorFailure::Embedding(error)) => {
                tracing::warn!(error = %error, "Embedding failed, serving fallback results");
                return Ok(SearchOutcome::Fallback { plan, error });
            }
            Err(VectorFailure::Backend(error)) => {
                tracing::error!(error = %error, "Vector search failed");
                return Err(error);
            }
        };
        let keyword_hits = keyword
            .map_err(|e| task_failed("keyword", e))?
            .inspect_err(|error| tracing::error!(error = %error, "Keyword search failed"))?;

        let counts = BranchCounts {
            embedding_results: neighbors.len(),
            keyword_results: keyword_hits.len(),
        };
        let results = self.ranker.merge(neighbors, keyword_hits, &plan.keywords);
        tracing::info!(
            embedding_results = counts.embedding_results,
            keyword_results = counts.keyword_results,
            total_results = results.len(),
            "Search complete"
        );
        Ok(SearchOutcome::Ranked {
            results,
            plan,
            counts,
        })
    }
}

/// Spawned branch that is aborted when dropped, so a cancelled request also
/// cancels its outbound calls.
struct BranchTask<T>(JoinHandle<T>);

impl<T: Send + 'static> BranchTask<T> {
    fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }
}

impl<T> Future for BranchTask<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for BranchTask<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn task_failed(branch: &'static str, err: JoinError) -> BackendError {
    BackendError::Task {
        branch,
        message: err.to_string(),
    }
}

async fn vector_branch(
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn CatalogBackend>,
    text: String,
    threshold: f32,
    limit: usize,
    timeout: Duration,
) -> Result<Vec<Neighbor>, VectorFailure> {
    let start = Instant::now();
    let embedded = match tokio::time::timeout(timeout, embedder.embed(&text)).await {
        Ok(result) => result,
        Err(_) => Err(EmbeddingError::Timeout(timeout)),
    };
    metrics::record_branch("embedding", start.elapsed(), embedded.is_ok());
    let embedding = embedded.map_err(VectorFailure::Embedding)?;

    let start = Instant::now();
    let neighbors =
        match tokio::time::timeout(timeout, backend.nearest_neighbors(&embedding, threshold, limit))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout {
                branch: "vector",
                after: timeout,
            }),
        };
    metrics::record_branch("vector", start.elapsed(), neighbors.is_ok());
    neighbors.map_err(VectorFailure::Backend)
}

async fn keyword_branch(
    backend: Arc<dyn CatalogBackend>,
    filter: KeywordFilter,
    limit: usize,
    timeout: Duration,
) -> Result<Vec<CatalogEntry>, BackendError> {
    if filter.is_empty() {
        return Ok(Vec::new());
    }
    let start = Instant::now();
    let hits = match tokio::time::timeout(timeout, backend.keyword_filter(&filter, limit)).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout {
            branch: "keyword",
            after: timeout,
        }),
    };
    metrics::record_branch("keyword", start.elapsed(), hits.is_ok());
    hits
}
