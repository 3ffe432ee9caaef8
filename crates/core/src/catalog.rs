//! Catalog data model.
//!
//! A [`CatalogEntry`] is one book record owned by the catalog database. The
//! search core only reads entries; it never writes them. [`ScoredResult`] is
//! the per-request ranked view of an entry, carrying the raw vector similarity,
//! the keyword score, and the combined score used for ordering.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque catalog entry identifier.
///
/// Hosted databases hand out either integer or UUID/text keys, so both JSON
/// numbers and strings are accepted and normalized to their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CatalogId(String);

impl CatalogId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CatalogId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Int(i64),
            Uint(u64),
        }
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => CatalogId(s),
            RawId::Int(i) => CatalogId(i.to_string()),
            RawId::Uint(u) => CatalogId(u.to_string()),
        })
    }
}

/// Textual fields of a catalog entry that participate in keyword search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogField {
    Title,
    Author,
    Subject,
    Level,
    Type,
    Publisher,
    Description,
}

impl CatalogField {
    /// All searchable fields, in haystack order.
    pub const ALL: [CatalogField; 7] = [
        CatalogField::Title,
        CatalogField::Author,
        CatalogField::Subject,
        CatalogField::Level,
        CatalogField::Type,
        CatalogField::Publisher,
        CatalogField::Description,
    ];

    /// Database column name for this field.
    pub fn column(self) -> &'static str {
        match self {
            CatalogField::Title => "title",
            CatalogField::Author => "author",
            CatalogField::Subject => "subject",
            CatalogField::Level => "level",
            CatalogField::Type => "type",
            CatalogField::Publisher => "publisher",
            CatalogField::Description => "description",
        }
    }
}

/// One book record in the catalog.
///
/// All text fields are nullable in the database; a missing field reads as the
/// empty string through [`CatalogEntry::field`]. The embedding is either absent
/// or a vector of the embedding provider's fixed dimensionality. It is read for
/// vector search but never echoed back to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: CatalogId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing,
        deserialize_with = "deserialize_embedding"
    )]
    pub embedding: Option<Vec<f32>>,
}

impl Default for CatalogId {
    fn default() -> Self {
        CatalogId(String::new())
    }
}

impl CatalogEntry {
    /// Creates an entry with the given id and no fields set.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: CatalogId::new(id),
            ..Self::default()
        }
    }

    /// Returns the value of a text field, or `""` when it is null.
    pub fn field(&self, field: CatalogField) -> &str {
        let value = match field {
            CatalogField::Title => &self.title,
            CatalogField::Author => &self.author,
            CatalogField::Subject => &self.subject,
            CatalogField::Level => &self.level,
            CatalogField::Type => &self.kind,
            CatalogField::Publisher => &self.publisher,
            CatalogField::Description => &self.description,
        };
        value.as_deref().unwrap_or("")
    }

    /// Lower-cased concatenation of all text fields, space separated.
    pub fn haystack(&self) -> String {
        CatalogField::ALL
            .iter()
            .map(|&f| self.field(f))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

/// Accepts an embedding as a JSON array, `null`, or the pgvector text form `"[0.1,0.2]"`.
fn deserialize_embedding<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<f32>>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawEmbedding {
        Vector(Vec<f32>),
        Text(String),
    }
    match Option::<RawEmbedding>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawEmbedding::Vector(v)) => Ok(Some(v)),
        Some(RawEmbedding::Text(s)) => serde_json::from_str::<Vec<f32>>(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// A vector-search hit: a catalog entry with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub similarity: f32,
}

/// A catalog entry ranked for one search request.
///
/// `raw_similarity` is the cosine similarity from the vector branch (`None`
/// when the entry was found by keyword search only). `combined_score` is the
/// ranking key. On the wire the scores keep their historical names:
/// `originalSimilarity`, `keywordScore`, and `similarity` (the combined score).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    #[serde(rename = "originalSimilarity")]
    pub raw_similarity: Option<f32>,
    #[serde(rename = "keywordScore")]
    pub keyword_score: f32,
    #[serde(rename = "similarity")]
    pub combined_score: f32,
}

impl ScoredResult {
    /// Result backed by embedding evidence: `combined = raw + keyword`.
    pub fn from_vector(entry: CatalogEntry, raw_similarity: f32, keyword_score: f32) -> Self {
        Self {
            entry,
            raw_similarity: Some(raw_similarity),
            keyword_score,
            combined_score: raw_similarity + keyword_score,
        }
    }

    /// Result found by keyword search only: `combined = baseline + keyword`.
    pub fn from_keyword(entry: CatalogEntry, keyword_score: f32) -> Self {
        Self {
            entry,
            raw_similarity: None,
            keyword_score,
            combined_score: crate::config::KEYWORD_ONLY_BASELINE + keyword_score,
        }
    }
}
