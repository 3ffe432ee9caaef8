//! Global configuration constants for bookfinder.
//!
//! All ranking weights, search thresholds, input limits, and server defaults are
//! defined here. These are compile-time constants; runtime configuration is handled
//! via CLI arguments and environment variables in the server's `main.rs`.

/// Queries with at most this many whitespace-separated tokens count as "short".
///
/// Short queries get a more permissive vector threshold and a book-context
/// phrase prepended before embedding.
pub const SHORT_QUERY_MAX_TOKENS: usize = 2;

/// Cosine similarity threshold for short queries.
///
/// Short queries produce less confident embeddings, so the net is cast wider.
pub const SHORT_QUERY_SIMILARITY_THRESHOLD: f32 = 0.4;

/// Cosine similarity threshold for queries longer than [`SHORT_QUERY_MAX_TOKENS`].
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.5;

/// Maximum number of entries returned by the vector branch.
pub const VECTOR_MATCH_COUNT: usize = 20;

/// Maximum number of entries returned by the keyword branch.
pub const KEYWORD_MATCH_COUNT: usize = 20;

/// Tokens shorter than this (in characters) are discarded by the query tokenizer.
pub const MIN_TOKEN_CHARS: usize = 3;

/// Combined score baseline for entries found only by keyword search.
///
/// Stands in for the missing embedding evidence.
pub const KEYWORD_ONLY_BASELINE: f32 = 0.5;

/// Upper bound of the keyword score contribution.
///
/// The normalized keyword score (0–1) is multiplied by this factor.
pub const KEYWORD_SCORE_CAP: f32 = 0.8;

/// Per-keyword factor for a whole-word match anywhere in the entry text.
pub const WHOLE_WORD_FACTOR: f32 = 0.4;

/// Per-keyword factor for a substring-only match anywhere in the entry text.
pub const SUBSTRING_FACTOR: f32 = 0.2;

/// Additional factor when the keyword appears in the title.
pub const TITLE_FACTOR: f32 = 0.3;

/// Additional factor when the keyword appears in the subject.
pub const SUBJECT_FACTOR: f32 = 0.2;

/// Additional factor when the keyword matches the publisher as a whole word.
///
/// Dominant signal: publisher-name queries rank publisher matches above everything else.
pub const PUBLISHER_EXACT_FACTOR: f32 = 1.0;

/// Additional factor when the keyword is a substring of the publisher.
pub const PUBLISHER_PARTIAL_FACTOR: f32 = 0.6;

/// Additional factor when the keyword appears in the entry type.
pub const TYPE_FACTOR: f32 = 0.2;

/// Weight of an ordinary query keyword.
pub const DEFAULT_KEYWORD_WEIGHT: f32 = 1.0;

/// Weight of a keyword matching a known publisher name or publisher term.
pub const PUBLISHER_TERM_WEIGHT: f32 = 2.0;

/// Weight of a keyword matching a book-category term (e.g. "schulbuch").
pub const CATEGORY_TERM_WEIGHT: f32 = 1.5;

/// Embedding model identifier sent to the embedding provider.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Maximum accepted query length in bytes (after trimming).
pub const MAX_QUERY_LEN: usize = 1_000;

/// Per-branch timeout (embedding + vector query, keyword query) in seconds.
pub const DEFAULT_BRANCH_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 3030;

/// Minimum per-request timeout in seconds. The router raises it when the
/// branch timeouts plus token validation could take longer.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout in seconds for one call to the remote identity service.
pub const AUTH_TIMEOUT_SECS: u64 = 5;

/// Global rate limit in requests per second.
pub const RATE_LIMIT_RPS: u64 = 50;

/// Maximum HTTP request body size in bytes (64 KB).
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Maximum number of concurrent in-flight requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 256;

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;
