//! Topic-scoped keyword overlap between a candidate text and cell entries.

use std::collections::{BTreeMap, BTreeSet};

use linus_core::text::normalize;
use linus_core::{Cell, TOPICS, TopicId};

/// Extracts topic keyword sets and scores their overlap.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    topic_keywords: BTreeMap<TopicId, Vec<String>>,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityEngine {
    pub fn new() -> Self {
        Self {
            topic_keywords: TOPICS
                .iter()
                .map(|t| {
                    let keywords = t
                        .keywords
                        .iter()
                        .map(|k| k.to_lowercase())
                        .filter(|k| !k.is_empty())
                        .collect();
                    (t.id, keywords)
                })
                .collect(),
        }
    }

    /// Keywords of `topic_id` contained in the normalized text.
    pub fn tokens(&self, text: &str, topic_id: TopicId) -> BTreeSet<String> {
        let normalized = normalize(text);
        self.topic_keywords
            .get(&topic_id)
            .map(|keywords| {
                keywords
                    .iter()
                    .filter(|kw| normalized.contains(kw.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `|A∩B| / min(|A|,|B|)`; 1.0 when both are empty, 0.0 when one is.
    pub fn overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => 1.0,
            (true, false) | (false, true) => 0.0,
            (false, false) => {
                let shared = a.intersection(b).count();
                shared as f64 / a.len().min(b.len()) as f64
            }
        }
    }

    /// Highest overlap between `text` and any accepted entry of the cell.
    ///
    /// 0.0 when the cell has no entries or the text carries none of the
    /// cell's keywords.
    pub fn max_similarity(&self, text: &str, cell: &Cell) -> f64 {
        if cell.entries.is_empty() {
            return 0.0;
        }
        let tokens = self.tokens(text, cell.id());
        if tokens.is_empty() {
            return 0.0;
        }
        cell.entries
            .iter()
            .map(|entry| Self::overlap(&tokens, &self.tokens(&entry.snippet, cell.id())))
            .fold(0.0, f64::max)
    }
}
