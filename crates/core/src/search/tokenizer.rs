//! Query tokenizer with stop word removal.
//!
//! Splits a query on whitespace, lower-cases each token, and drops tokens that
//! are too short or listed as stop words in the [`KeywordTable`]. Duplicates are
//! removed, keeping first occurrence order, so a repeated word neither widens
//! the keyword filter nor counts twice in the ranker's normalization.

use crate::config;
use crate::search::keywords::KeywordTable;

/// Number of whitespace-separated tokens in the raw query, before any filtering.
pub fn raw_token_count(query: &str) -> usize {
    query.split_whitespace().count()
}

/// Significant lower-cased tokens of a query.
pub fn significant_tokens(query: &str, table: &KeywordTable) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for raw in query.split_whitespace() {
        let token = raw.to_lowercase();
        if token.chars().count() < config::MIN_TOKEN_CHARS || table.is_stop_word(&token) {
            continue;
        }
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let table = KeywordTable::default();
        let tokens = significant_tokens("Die Physik der Sterne", &table);
        assert_eq!(tokens, vec!["physik", "sterne"]);
    }

    #[test]
    fn test_short_tokens_dropped() {
        let table = KeywordTable::default();
        assert!(significant_tokens("ab", &table).is_empty());
        assert!(significant_tokens("  a bc  ", &table).is_empty());
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let table = KeywordTable::default();
        // "öl" is two chars but three bytes
        assert!(significant_tokens("öl", &table).is_empty());
        assert_eq!(significant_tokens("Ökö", &table), vec!["ökö"]);
    }

    #[test]
    fn test_duplicates_removed() {
        let table = KeywordTable::default();
        assert_eq!(
            significant_tokens("Klett klett KLETT Biologie", &table),
            vec!["klett", "biologie"]
        );
    }

    #[test]
    fn test_raw_token_count() {
        assert_eq!(raw_token_count("  cornelsen  "), 1);
        assert_eq!(raw_token_count("mathe 5 klasse"), 3);
        assert_eq!(raw_token_count(""), 0);
    }
}
