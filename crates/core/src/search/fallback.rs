//! Placeholder results for when the embedding provider is unavailable.
//!
//! Search must keep the UI usable, so an embedding outage yields this small,
//! non-authoritative list instead of an error.

use crate::catalog::{CatalogEntry, ScoredResult};

struct Placeholder {
    id: &'static str,
    title: &'static str,
    author: &'static str,
    subject: &'static str,
    level: &'static str,
    kind: &'static str,
    publisher: &'static str,
    description: &'static str,
    score: f32,
}

const PLACEHOLDERS: &[Placeholder] = &[
    Placeholder {
        id: "fallback-1",
        title: "Mathematik 5",
        author: "Redaktion",
        subject: "Mathematik",
        level: "Sekundarstufe I",
        kind: "Schulbuch",
        publisher: "Cornelsen",
        description: "Grundlagen der Mathematik für die 5. Klasse.",
        score: 0.5,
    },
    Placeholder {
        id: "fallback-2",
        title: "Deutsch Kompetent",
        author: "Redaktion",
        subject: "Deutsch",
        level: "Sekundarstufe I",
        kind: "Schulbuch",
        publisher: "Klett",
        description: "Lese- und Schreibkompetenz im Deutschunterricht.",
        score: 0.45,
    },
    Placeholder {
        id: "fallback-3",
        title: "Diercke Weltatlas",
        author: "Redaktion",
        subject: "Geographie",
        level: "Alle Stufen",
        kind: "Atlas",
        publisher: "Westermann",
        description: "Der Standardatlas für Schule und Studium.",
        score: 0.4,
    },
];

/// The fixed fallback list, highest score first.
pub fn fallback_results() -> Vec<ScoredResult> {
    PLACEHOLDERS
        .iter()
        .map(|p| ScoredResult {
            entry: CatalogEntry {
                title: Some(p.title.to_string()),
                author: Some(p.author.to_string()),
                subject: Some(p.subject.to_string()),
                level: Some(p.level.to_string()),
                kind: Some(p.kind.to_string()),
                publisher: Some(p.publisher.to_string()),
                description: Some(p.description.to_string()),
                ..CatalogEntry::with_id(p.id)
            },
            raw_similarity: None,
            keyword_score: 0.0,
            combined_score: p.score,
        })
        .collect()
}
