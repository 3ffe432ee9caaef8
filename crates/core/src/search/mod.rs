//! Hybrid search planning, ranking, and fallback results.
//!
//! A [`SearchPlan`] is everything the two search branches and the merger need,
//! derived synchronously from the user's query before any I/O happens.

/// Query enhancement for the embedding input.
pub mod enhancer;
/// Fixed placeholder results served when embeddings are unavailable.
pub mod fallback;
/// Disjunctive substring filter for the keyword branch.
pub mod filter;
/// Domain vocabulary and term weights.
pub mod keywords;
/// Result merging and keyword-weighted ranking.
pub mod ranker;
/// Whitespace query tokenizer with stop word removal.
pub mod tokenizer;

pub use enhancer::{EnhancedQuery, EnhancementKind, QueryEnhancer};
pub use filter::KeywordFilter;
pub use keywords::{KeywordTable, WeightedKeyword};
pub use ranker::Ranker;

use crate::config;
use crate::error::QueryError;

/// Trims a raw query and rejects empty or oversized input.
pub fn normalize_query(raw: &str) -> Result<&str, QueryError> {
    let query = raw.trim();
    if query.is_empty() {
        return Err(QueryError::Empty);
    }
    if query.len() > config::MAX_QUERY_LEN {
        return Err(QueryError::TooLong {
            max: config::MAX_QUERY_LEN,
        });
    }
    Ok(query)
}

/// Vector similarity threshold for a query with `token_count` raw tokens.
///
/// Short queries embed less confidently and get the lower threshold.
pub fn similarity_threshold(token_count: usize) -> f32 {
    if token_count <= config::SHORT_QUERY_MAX_TOKENS {
        config::SHORT_QUERY_SIMILARITY_THRESHOLD
    } else {
        config::DEFAULT_SIMILARITY_THRESHOLD
    }
}

/// Per-request search inputs.
#[derive(Debug, Clone)]
pub struct SearchPlan {
    /// Trimmed user query, as typed.
    pub original: String,
    /// Text sent to the embedding provider.
    pub enhanced: EnhancedQuery,
    /// Whitespace token count of the original query.
    pub token_count: usize,
    /// Cosine threshold for the vector branch.
    pub threshold: f32,
    /// Weighted keywords of the original query, used by the ranker.
    pub keywords: Vec<WeightedKeyword>,
    /// Keyword-branch filter over the same tokens.
    pub filter: KeywordFilter,
}

impl SearchPlan {
    /// Builds the plan for a query already passed through [`normalize_query`].
    pub fn new(query: &str, enhancer: &QueryEnhancer, ranker: &Ranker) -> Self {
        let token_count = tokenizer::raw_token_count(query);
        let keywords = ranker.weighted_keywords(query);
        let tokens: Vec<String> = keywords.iter().map(|k| k.word.clone()).collect();
        Self {
            original: query.to_string(),
            enhanced: enhancer.enhance(query),
            token_count,
            threshold: similarity_threshold(token_count),
            filter: KeywordFilter::new(&tokens),
            keywords,
        }
    }
}
