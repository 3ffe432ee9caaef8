//! Disjunctive substring filter for keyword search.
//!
//! An entry matches a [`KeywordFilter`] if ANY token occurs, case-insensitively,
//! as a substring of ANY searchable field. The same filter is evaluated locally
//! by the in-memory catalog and rendered as a PostgREST `or=(...)` expression
//! for hosted databases.

use crate::catalog::{CatalogEntry, CatalogField};

/// OR-of-ORs substring filter over catalog text fields.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordFilter {
    tokens: Vec<String>,
    fields: Vec<CatalogField>,
}

impl KeywordFilter {
    /// Filter over all searchable fields. Tokens are lower-cased.
    pub fn new(tokens: &[String]) -> Self {
        Self::over_fields(tokens, &CatalogField::ALL)
    }

    pub fn over_fields(tokens: &[String], fields: &[CatalogField]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_lowercase()).collect(),
            fields: fields.to_vec(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn fields(&self) -> &[CatalogField] {
        &self.fields
    }

    /// A filter without tokens matches nothing; callers skip the query entirely.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() || self.fields.is_empty()
    }

    /// Check if an entry satisfies the filter.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        self.fields.iter().any(|&field| {
            let value = entry.field(field);
            if value.is_empty() {
                return false;
            }
            let value = value.to_lowercase();
            self.tokens.iter().any(|t| value.contains(t.as_str()))
        })
    }

    /// Renders the PostgREST logical-or expression, e.g.
    /// `(title.ilike."*klett*",author.ilike."*klett*")`.
    ///
    /// Returns `None` for an empty filter.
    pub fn to_postgrest_or(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let mut conditions = Vec::with_capacity(self.tokens.len() * self.fields.len());
        for token in &self.tokens {
            let pattern = quote_value(&format!("*{}*", escape_like(token)));
            for field in &self.fields {
                conditions.push(format!("{}.ilike.{}", field.column(), pattern));
            }
        }
        Some(format!("({})", conditions.join(",")))
    }
}

/// Escapes SQL LIKE metacharacters so tokens match literally.
fn escape_like(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for c in token.chars() {
        if matches!(c, '%' | '_' | '*') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Double-quotes a PostgREST filter value so `,` `(` `)` and `.` are taken literally.
fn quote_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, publisher: &str) -> CatalogEntry {
        CatalogEntry {
            title: Some(title.into()),
            publisher: Some(publisher.into()),
            ..CatalogEntry::with_id("e")
        }
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_any_token_any_field() {
        let filter = KeywordFilter::new(&tokens(&["biologie", "klett"]));
        assert!(filter.matches(&entry("Mathematik", "Ernst Klett Verlag")));
        assert!(filter.matches(&entry("Biologie heute", "Schroedel")));
        assert!(!filter.matches(&entry("Mathematik", "Cornelsen")));
    }

    #[test]
    fn test_case_insensitive_substring() {
        let filter = KeywordFilter::new(&tokens(&["BIO"]));
        assert!(filter.matches(&entry("Mikrobiologie", "")));
    }

    #[test]
    fn test_restricted_fields() {
        let filter = KeywordFilter::over_fields(&tokens(&["klett"]), &[CatalogField::Title]);
        assert!(!filter.matches(&entry("Mathematik", "Klett")));
    }

    #[test]
    fn test_null_fields_never_match() {
        let filter = KeywordFilter::new(&tokens(&["faust"]));
        assert!(!filter.matches(&CatalogEntry::with_id("empty")));
    }

    #[test]
    fn test_empty_filter() {
        let filter = KeywordFilter::new(&[]);
        assert!(filter.is_empty());
        assert_eq!(filter.to_postgrest_or(), None);
    }

    #[test]
    fn test_postgrest_expression() {
        let filter = KeywordFilter::over_fields(
            &tokens(&["klett"]),
            &[CatalogField::Title, CatalogField::Publisher],
        );
        assert_eq!(
            filter.to_postgrest_or().unwrap(),
            r#"(title.ilike."*klett*",publisher.ilike."*klett*")"#
        );
    }

    #[test]
    fn test_postgrest_escapes_reserved_characters() {
        let filter = KeywordFilter::over_fields(&tokens(&["a\"b_c"]), &[CatalogField::Title]);
        assert_eq!(
            filter.to_postgrest_or().unwrap(),
            r#"(title.ilike."*a\"b\\_c*")"#
        );
    }
}
