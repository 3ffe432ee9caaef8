//! Query enhancement before embedding.
//!
//! Short or publisher-flavoured queries embed poorly on their own, so the text
//! sent to the embedding provider is rewritten into a fuller phrase. Only the
//! embedding input changes; keyword search and ranking always work from the
//! original query.
//!
//! Rules, first match wins:
//! 1. query mentions a publisher term ("verlag", "press", ...) → `Bücher vom Verlag {query}`
//! 2. query contains a known publisher name → `{query} Verlag Bücher`
//! 3. query has at most [`SHORT_QUERY_MAX_TOKENS`](config::SHORT_QUERY_MAX_TOKENS)
//!    tokens → a book-context template chosen by the [`TemplatePicker`]
//! 4. otherwise the query is passed through

use crate::config;
use crate::search::keywords::KeywordTable;
use crate::search::tokenizer::raw_token_count;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;

const PUBLISHER_TEMPLATE: &str = "Bücher vom Verlag {query}";
const KNOWN_PUBLISHER_SUFFIX: &str = "Verlag Bücher";
const BOOK_CONTEXT_TEMPLATES: &[&str] = &[
    "Buch über {query}",
    "Literatur zu {query}",
    "Schulbuch zum Thema {query}",
];

/// Chooses one of `len` book-context templates.
///
/// The choice only shifts the embedding input, so it is not part of the
/// search contract. Inject [`FixedPicker`] or [`SeededPicker`] for
/// reproducible output.
pub trait TemplatePicker: Send + Sync {
    /// Returns an index in `0..len`. `len` is never zero.
    fn pick(&self, len: usize) -> usize;
}

/// Uniformly random choice from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPicker;

impl TemplatePicker for RandomPicker {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Reproducible pseudo-random choice from a seeded RNG.
#[derive(Debug)]
pub struct SeededPicker(Mutex<StdRng>);

impl SeededPicker {
    pub fn new(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

impl TemplatePicker for SeededPicker {
    fn pick(&self, len: usize) -> usize {
        self.0.lock().gen_range(0..len)
    }
}

/// Always the same template (index taken modulo the template count).
#[derive(Debug, Clone, Copy)]
pub struct FixedPicker(pub usize);

impl TemplatePicker for FixedPicker {
    fn pick(&self, len: usize) -> usize {
        self.0 % len
    }
}

/// Which rewrite rule produced the enhanced query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementKind {
    PublisherPhrase,
    KnownPublisher,
    BookContext,
    Unchanged,
}

/// Query text to embed, plus the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedQuery {
    pub text: String,
    pub kind: EnhancementKind,
}

/// Rewrites queries for embedding.
pub struct QueryEnhancer {
    table: Arc<KeywordTable>,
    templates: Vec<String>,
    picker: Box<dyn TemplatePicker>,
}

impl std::fmt::Debug for QueryEnhancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEnhancer")
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

impl QueryEnhancer {
    /// Enhancer with the built-in templates and a random picker.
    pub fn new(table: Arc<KeywordTable>) -> Self {
        Self::with_picker(table, Box::new(RandomPicker))
    }

    pub fn with_picker(table: Arc<KeywordTable>, picker: Box<dyn TemplatePicker>) -> Self {
        Self {
            table,
            templates: BOOK_CONTEXT_TEMPLATES.iter().map(|s| s.to_string()).collect(),
            picker,
        }
    }

    /// Replaces the book-context templates. Each must contain `{query}`;
    /// an empty list disables the short-query rule.
    pub fn with_templates(mut self, templates: Vec<String>) -> Self {
        self.templates = templates;
        self
    }

    /// Enhances a trimmed, non-empty query.
    pub fn enhance(&self, query: &str) -> EnhancedQuery {
        let lower = query.to_lowercase();

        if self.table.mentions_publisher_keyword(&lower) {
            return EnhancedQuery {
                text: PUBLISHER_TEMPLATE.replace("{query}", query),
                kind: EnhancementKind::PublisherPhrase,
            };
        }

        if self.table.find_publisher(&lower).is_some() {
            return EnhancedQuery {
                text: format!("{query} {KNOWN_PUBLISHER_SUFFIX}"),
                kind: EnhancementKind::KnownPublisher,
            };
        }

        if raw_token_count(query) <= config::SHORT_QUERY_MAX_TOKENS && !self.templates.is_empty() {
            let idx = self.picker.pick(self.templates.len());
            let template = &self.templates[idx.min(self.templates.len() - 1)];
            return EnhancedQuery {
                text: template.replace("{query}", query),
                kind: EnhancementKind::BookContext,
            };
        }

        EnhancedQuery {
            text: query.to_string(),
            kind: EnhancementKind::Unchanged,
        }
    }
}
