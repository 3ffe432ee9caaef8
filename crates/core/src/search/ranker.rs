//! Result merging and keyword-weighted re-ranking.
//!
//! Combines the vector branch (entries with a cosine similarity) and the keyword
//! branch (unordered entries) into one ranked list:
//! - vector hits: `similarity = raw + keyword_score`
//! - keyword-only hits: `similarity = 0.5 + keyword_score`
//! - an entry seen by both branches keeps its vector-derived record
//!
//! The keyword score rewards whole-word matches over substring matches and
//! gives publisher matches the dominant weight, so publisher-name queries put
//! that publisher's books first.

use crate::catalog::{CatalogEntry, CatalogField, CatalogId, Neighbor, ScoredResult};
use crate::config;
use crate::search::keywords::{KeywordTable, WeightedKeyword};
use crate::search::tokenizer::significant_tokens;
use ordered_float::OrderedFloat;
use regex::Regex;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

/// A weighted keyword with its whole-word pattern compiled once per request.
#[derive(Debug, Clone)]
pub struct CompiledKeyword {
    word: String,
    weight: f32,
    whole_word: Option<Regex>,
}

impl CompiledKeyword {
    pub fn new(keyword: &WeightedKeyword) -> Self {
        let word = keyword.word.to_lowercase();
        let whole_word = Regex::new(&format!(r"\b{}\b", regex::escape(&word))).ok();
        Self {
            word,
            weight: keyword.weight,
            whole_word,
        }
    }

    fn is_whole_word_in(&self, text: &str) -> bool {
        match &self.whole_word {
            Some(re) => re.is_match(text),
            None => text.contains(self.word.as_str()),
        }
    }

    fn is_substring_of(&self, text: &str) -> bool {
        text.contains(self.word.as_str())
    }
}

/// Lower-cased views of the fields the scoring rules look at.
struct EntryText {
    haystack: String,
    title: String,
    subject: String,
    publisher: String,
    kind: String,
}

impl EntryText {
    fn new(entry: &CatalogEntry) -> Self {
        Self {
            haystack: entry.haystack(),
            title: entry.field(CatalogField::Title).to_lowercase(),
            subject: entry.field(CatalogField::Subject).to_lowercase(),
            publisher: entry.field(CatalogField::Publisher).to_lowercase(),
            kind: entry.field(CatalogField::Type).to_lowercase(),
        }
    }
}

/// Merges and ranks the two search branches using a [`KeywordTable`].
#[derive(Debug, Clone)]
pub struct Ranker {
    table: Arc<KeywordTable>,
}

impl Ranker {
    pub fn new(table: Arc<KeywordTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// Weighted keywords of the ORIGINAL (unenhanced) query.
    pub fn weighted_keywords(&self, query: &str) -> Vec<WeightedKeyword> {
        self.table.weigh(&significant_tokens(query, &self.table))
    }

    /// Keyword score of one entry, in `0.0..=KEYWORD_SCORE_CAP`.
    pub fn keyword_score(&self, entry: &CatalogEntry, keywords: &[WeightedKeyword]) -> f32 {
        let compiled: Vec<CompiledKeyword> = keywords.iter().map(CompiledKeyword::new).collect();
        score_entry(&EntryText::new(entry), &compiled)
    }

    /// Deduplicates, scores, and sorts both branches.
    ///
    /// The sort is stable: equal combined scores keep encounter order
    /// (vector hits in similarity order, then keyword hits in backend order).
    pub fn merge(
        &self,
        vector_hits: Vec<Neighbor>,
        keyword_hits: Vec<CatalogEntry>,
        keywords: &[WeightedKeyword],
    ) -> Vec<ScoredResult> {
        let compiled: Vec<CompiledKeyword> = keywords.iter().map(CompiledKeyword::new).collect();
        let mut seen: HashSet<CatalogId> =
            HashSet::with_capacity(vector_hits.len() + keyword_hits.len());
        let mut merged: Vec<ScoredResult> =
            Vec::with_capacity(vector_hits.len() + keyword_hits.len());

        for hit in vector_hits {
            if !seen.insert(hit.entry.id.clone()) {
                continue;
            }
            let score = score_entry(&EntryText::new(&hit.entry), &compiled);
            merged.push(ScoredResult::from_vector(hit.entry, hit.similarity, score));
        }

        for entry in keyword_hits {
            if !seen.insert(entry.id.clone()) {
                continue;
            }
            let score = score_entry(&EntryText::new(&entry), &compiled);
            merged.push(ScoredResult::from_keyword(entry, score));
        }

        merged.sort_by_key(|r| Reverse(OrderedFloat(r.combined_score)));
        merged
    }
}

fn score_entry(text: &EntryText, keywords: &[CompiledKeyword]) -> f32 {
    let mut total_score = 0.0f32;
    let mut total_weight = 0.0f32;

    for kw in keywords {
        let w = kw.weight;
        total_weight += w;

        if kw.is_whole_word_in(&text.haystack) {
            total_score += w * config::WHOLE_WORD_FACTOR;
        } else if kw.is_substring_of(&text.haystack) {
            total_score += w * config::SUBSTRING_FACTOR;
        }

        if kw.is_substring_of(&text.title) {
            total_score += w * config::TITLE_FACTOR;
        }
        if kw.is_substring_of(&text.subject) {
            total_score += w * config::SUBJECT_FACTOR;
        }

        if kw.is_whole_word_in(&text.publisher) {
            total_score += w * config::PUBLISHER_EXACT_FACTOR;
        } else if kw.is_substring_of(&text.publisher) {
            total_score += w * config::PUBLISHER_PARTIAL_FACTOR;
        }

        if kw.is_substring_of(&text.kind) {
            total_score += w * config::TYPE_FACTOR;
        }
    }

    if total_weight <= 0.0 {
        return 0.0;
    }
    let normalized = (total_score / total_weight).clamp(0.0, 1.0);
    normalized * config::KEYWORD_SCORE_CAP
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranker() -> Ranker {
        Ranker::new(Arc::new(KeywordTable::default()))
    }

    fn book(id: &str, title: &str, publisher: &str) -> CatalogEntry {
        CatalogEntry {
            title: Some(title.into()),
            publisher: Some(publisher.into()),
            ..CatalogEntry::with_id(id)
        }
    }

    fn kw(word: &str, weight: f32) -> WeightedKeyword {
        WeightedKeyword {
            word: word.into(),
            weight,
        }
    }

    fn hit(entry: CatalogEntry, similarity: f32) -> Neighbor {
        Neighbor { entry, similarity }
    }

    #[test]
    fn test_no_keywords_scores_zero() {
        let r = ranker();
        assert_eq!(r.keyword_score(&book("a", "Faust", "Reclam"), &[]), 0.0);
    }

    #[test]
    fn test_whole_word_beats_substring() {
        let r = ranker();
        let keywords = [kw("physik", 1.0)];
        let whole = r.keyword_score(&book("a", "Physik heute", ""), &keywords);
        let partial = r.keyword_score(&book("b", "Astrophysikalisches", ""), &keywords);
        // whole: 0.4 + 0.3 title; partial: 0.2 + 0.3 title
        assert!((whole - 0.7 * 0.8).abs() < 1e-6);
        assert!((partial - 0.5 * 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_publisher_match_dominates() {
        let r = ranker();
        let keywords = r.weighted_keywords("cornelsen");
        assert_eq!(keywords[0].weight, config::PUBLISHER_TERM_WEIGHT);
        let by_publisher = r.keyword_score(&book("a", "Mathematik 5", "Cornelsen"), &keywords);
        let by_description = r.keyword_score(
            &CatalogEntry {
                description: Some("Ähnlich wie Cornelsen-Ausgaben".into()),
                ..CatalogEntry::with_id("b")
            },
            &keywords,
        );
        assert!(by_publisher > by_description);
        assert!((by_publisher - config::KEYWORD_SCORE_CAP).abs() < 1e-6);
    }

    #[test]
    fn test_partial_publisher_match() {
        let r = ranker();
        let keywords = [kw("klett", 1.0)];
        // "klettbuch" contains klett but not as a whole word
        let score = r.keyword_score(&book("a", "", "Klettbuch GmbH"), &keywords);
        assert!((score - (0.2 + 0.6) * 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_score_normalized_by_total_weight() {
        let r = ranker();
        let entry = CatalogEntry {
            subject: Some("Biologie".into()),
            ..CatalogEntry::with_id("a")
        };
        let one = r.keyword_score(&entry, &[kw("biologie", 1.0)]);
        let two = r.keyword_score(&entry, &[kw("biologie", 1.0), kw("chemie", 1.0)]);
        assert!((one - 0.6 * 0.8).abs() < 1e-6);
        assert!((two - 0.3 * 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_keyword_score_is_capped() {
        let r = ranker();
        let entry = CatalogEntry {
            title: Some("Duden Grammatik".into()),
            subject: Some("Grammatik".into()),
            kind: Some("Grammatik".into()),
            publisher: Some("Grammatik Verlag".into()),
            ..CatalogEntry::with_id("a")
        };
        let score = r.keyword_score(&entry, &[kw("grammatik", 1.5)]);
        assert!(score <= config::KEYWORD_SCORE_CAP + 1e-6);
        assert!(score >= 0.0);
    }

    #[test]
    fn test_adding_title_match_never_decreases_score() {
        let r = ranker();
        let keywords = [kw("vulkane", 2.0), kw("erde", 1.0)];
        let without = CatalogEntry {
            description: Some("Ein Buch über die Erde".into()),
            ..CatalogEntry::with_id("a")
        };
        let with = CatalogEntry {
            title: Some("Vulkane".into()),
            ..without.clone()
        };
        assert!(r.keyword_score(&with, &keywords) >= r.keyword_score(&without, &keywords));
    }

    #[test]
    fn test_merge_dedups_with_vector_precedence() {
        let r = ranker();
        let shared = book("shared", "Biologie 7", "Klett");
        let merged = r.merge(
            vec![hit(shared.clone(), 0.62)],
            vec![shared, book("kw", "Biologie kompakt", "Duden")],
            &[kw("biologie", 1.0)],
        );
        assert_eq!(merged.len(), 2);
        let shared = merged.iter().find(|m| m.entry.id.as_str() == "shared").unwrap();
        assert_eq!(shared.raw_similarity, Some(0.62));
        let kw_only = merged.iter().find(|m| m.entry.id.as_str() == "kw").unwrap();
        assert_eq!(kw_only.raw_similarity, None);
        assert!(kw_only.combined_score >= config::KEYWORD_ONLY_BASELINE);
    }

    #[test]
    fn test_merge_sorted_descending() {
        let r = ranker();
        let merged = r.merge(
            vec![
                hit(book("v1", "Chemie", ""), 0.55),
                hit(book("v2", "Geschichte", ""), 0.9),
            ],
            vec![book("k1", "Chemie Grundlagen", "")],
            &[kw("chemie", 1.0)],
        );
        for pair in merged.windows(2) {
            assert!(pair[0].combined_score >= pair[1].combined_score);
        }
        let ids: HashSet<&str> = merged.iter().map(|m| m.entry.id.as_str()).collect();
        assert_eq!(ids.len(), merged.len());
    }

    #[test]
    fn test_merge_ties_keep_encounter_order() {
        let r = ranker();
        let merged = r.merge(
            vec![],
            vec![book("first", "", ""), book("second", "", ""), book("third", "", "")],
            &[kw("nothing", 1.0)],
        );
        let ids: Vec<&str> = merged.iter().map(|m| m.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_merge_collapses_duplicate_vector_hits() {
        let r = ranker();
        let merged = r.merge(
            vec![hit(book("a", "", ""), 0.8), hit(book("a", "", ""), 0.7)],
            vec![],
            &[],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].raw_similarity, Some(0.8));
    }

    #[test]
    fn test_umlaut_whole_word_boundary() {
        let r = ranker();
        let keywords = [kw("märchen", 1.0)];
        let score = r.keyword_score(&book("a", "Grimms Märchen", ""), &keywords);
        assert!((score - 0.7 * 0.8).abs() < 1e-6);
    }
}
