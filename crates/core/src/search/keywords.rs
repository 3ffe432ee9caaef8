//! Keyword weighting table.
//!
//! Holds the domain vocabulary the ranker and the query enhancer consult:
//! stop words, known school-book publishers, generic publisher terms, and
//! book-category terms. The table is plain data handed to the components that
//! need it, so tests can swap in a smaller vocabulary.

use crate::config;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    // German
    "der", "die", "das", "den", "dem", "des", "ein", "eine", "einer", "eines", "einem", "einen",
    "und", "oder", "aber", "mit", "von", "vom", "für", "fuer", "über", "ueber", "auf", "aus",
    "bei", "nach", "zum", "zur", "ist", "sind", "wie", "was", "wer", "nicht", "auch", "als",
    "noch", "ich", "sie", "wir", "ihr", "sich", "bis", "durch", "gegen", "ohne", "um",
    // English
    "the", "and", "for", "with", "from", "about", "into", "this", "that", "are", "was", "not",
    "but", "all", "any", "can", "has", "have", "its", "our", "out", "you", "your", "how", "what",
    "who", "which", "book", "books",
];

const KNOWN_PUBLISHERS: &[&str] = &[
    "cornelsen",
    "klett",
    "westermann",
    "diesterweg",
    "schroedel",
    "duden",
    "oldenbourg",
    "buchner",
    "schöningh",
    "mildenberger",
    "hueber",
    "langenscheidt",
    "carlsen",
    "ravensburger",
    "auer",
    "persen",
    "stark",
    "reclam",
];

const PUBLISHER_KEYWORDS: &[&str] = &["verlag", "publisher", "edition", "press", "herausgeber"];

const CATEGORY_TERMS: &[&str] = &[
    "schulbuch",
    "lehrbuch",
    "textbook",
    "arbeitsheft",
    "workbook",
    "lektüre",
    "roman",
    "novel",
    "sachbuch",
    "lexikon",
    "wörterbuch",
    "dictionary",
    "atlas",
    "grammatik",
    "grammar",
    "übungsheft",
];

/// A query token with its ranking weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedKeyword {
    /// Lower-cased token from the original query.
    pub word: String,
    /// Score multiplier: 1.0 by default, boosted for domain-significant terms.
    pub weight: f32,
}

/// Domain vocabulary and term weights used by the ranker and the enhancer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordTable {
    pub stop_words: HashSet<String>,
    pub publishers: Vec<String>,
    pub publisher_keywords: Vec<String>,
    pub categories: Vec<String>,
    pub default_weight: f32,
    pub publisher_weight: f32,
    pub category_weight: f32,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().map(|s| s.to_string()).collect(),
            publishers: KNOWN_PUBLISHERS.iter().map(|s| s.to_string()).collect(),
            publisher_keywords: PUBLISHER_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            categories: CATEGORY_TERMS.iter().map(|s| s.to_string()).collect(),
            default_weight: config::DEFAULT_KEYWORD_WEIGHT,
            publisher_weight: config::PUBLISHER_TERM_WEIGHT,
            category_weight: config::CATEGORY_TERM_WEIGHT,
        }
    }
}

/// `true` if either string contains the other.
fn overlaps(token: &str, term: &str) -> bool {
    token.contains(term) || term.contains(token)
}

impl KeywordTable {
    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    /// Weight for a lower-cased token.
    ///
    /// A token is boosted when it matches, or is matched by, a table term.
    /// Publisher terms win over category terms.
    pub fn weight_for(&self, token: &str) -> f32 {
        let is_publisher = self
            .publishers
            .iter()
            .chain(self.publisher_keywords.iter())
            .any(|term| overlaps(token, term));
        if is_publisher {
            return self.publisher_weight;
        }
        if self.categories.iter().any(|term| overlaps(token, term)) {
            return self.category_weight;
        }
        self.default_weight
    }

    /// Assigns a weight to each token.
    pub fn weigh(&self, tokens: &[String]) -> Vec<WeightedKeyword> {
        tokens
            .iter()
            .map(|word| WeightedKeyword {
                word: word.clone(),
                weight: self.weight_for(word),
            })
            .collect()
    }

    /// `true` if the lower-cased query contains a generic publisher term.
    pub fn mentions_publisher_keyword(&self, lower_query: &str) -> bool {
        self.publisher_keywords
            .iter()
            .any(|k| lower_query.contains(k.as_str()))
    }

    /// First known publisher name contained in the lower-cased query.
    pub fn find_publisher(&self, lower_query: &str) -> Option<&str> {
        self.publishers
            .iter()
            .find(|p| lower_query.contains(p.as_str()))
            .map(String::as_str)
    }
}
