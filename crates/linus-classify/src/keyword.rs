//! Keyword-based grid classification.
//!
//! Each topic scores the number of its keywords found (substring containment)
//! in the normalized text. No stemming: most keywords are CJK.

use linus_core::text::{normalize, round2};
use linus_core::{Assignment, DEFAULT_TOPIC_ID, TOPICS, TopicId};

/// Assignments below this confidence are discarded.
const MIN_CONFIDENCE: f64 = 0.4;
/// Pseudo-score given to the default topic when nothing matches.
const NO_MATCH_SCORE: f64 = 0.1;
/// Confidence of the synthesized assignment when every candidate was dropped.
const SYNTHESIZED_CONFIDENCE: f64 = 0.5;

struct ScoredTopic {
    topic_id: TopicId,
    score: f64,
    matched: Vec<String>,
}

/// Deterministic classifier. Never fails and never returns an empty list.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keyword_map: Vec<(TopicId, Vec<String>)>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self {
            keyword_map: TOPICS
                .iter()
                .map(|t| (t.id, t.keywords.iter().map(|k| k.to_lowercase()).collect()))
                .collect(),
        }
    }

    /// Classify text. The first assignment is primary, the rest secondary.
    pub fn classify(&self, text: &str) -> Vec<Assignment> {
        let normalized = normalize(text);
        let mut assignments: Vec<Assignment> = Vec::new();

        for scored in self.score_topics(&normalized) {
            let confidence = Self::confidence(scored.score, !scored.matched.is_empty());
            if confidence < MIN_CONFIDENCE {
                continue;
            }
            assignments.push(Assignment {
                topic_id: scored.topic_id,
                confidence,
                secondary: !assignments.is_empty(),
                related_keywords: scored.matched,
            });
        }

        if assignments.is_empty() {
            assignments.push(Assignment::primary(
                DEFAULT_TOPIC_ID,
                SYNTHESIZED_CONFIDENCE,
                Vec::new(),
            ));
        }
        assignments
    }

    /// Topics with at least one match, best first. Ties keep topic order.
    fn score_topics(&self, normalized: &str) -> Vec<ScoredTopic> {
        let mut scored: Vec<ScoredTopic> = self
            .keyword_map
            .iter()
            .map(|(topic_id, keywords)| {
                let matched: Vec<String> = keywords
                    .iter()
                    .filter(|kw| !kw.is_empty() && normalized.contains(kw.as_str()))
                    .cloned()
                    .collect();
                ScoredTopic {
                    topic_id: *topic_id,
                    score: matched.len() as f64,
                    matched,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        if scored.first().map_or(true, |best| best.score == 0.0) {
            return vec![ScoredTopic {
                topic_id: DEFAULT_TOPIC_ID,
                score: NO_MATCH_SCORE,
                matched: Vec::new(),
            }];
        }
        scored.retain(|s| s.score > 0.0);
        scored
    }

    fn confidence(score: f64, has_keywords: bool) -> f64 {
        let base = if has_keywords { 0.55 } else { 0.45 };
        let boost = (score * 0.18).min(0.4);
        round2((base + boost).min(0.95))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_text_goes_to_brand_grid() {
        let classifier = KeywordClassifier::new();
        let result = classifier.classify("合約 SOW 條款需要立即補進合作文件中。");
        let primary = &result[0];
        assert_eq!(primary.topic_id, 3);
        assert!(!primary.secondary);
        assert!(primary.confidence >= 0.8);
        assert_eq!(primary.related_keywords, vec!["合約", "sow"]);
        assert!(result[1..].iter().all(|a| a.secondary));
    }

    #[test]
    fn test_ties_keep_topic_order() {
        let classifier = KeywordClassifier::new();
        // One match each for grid 2 (合作) and grid 8 (付款).
        let result = classifier.classify("合作 付款");
        let ids: Vec<_> = result.iter().map(|a| a.topic_id).collect();
        assert_eq!(ids, vec![2, 8]);
    }

    #[test]
    fn test_no_match_falls_to_default_topic_with_low_confidence() {
        let classifier = KeywordClassifier::new();
        let result = classifier.classify("需要再想想，暫時沒有具體分類。");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].topic_id, DEFAULT_TOPIC_ID);
        assert!(result[0].confidence < 0.6);
        assert!(result[0].related_keywords.is_empty());
    }

    #[test]
    fn test_empty_text_is_never_empty() {
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.classify("").len(), 1);
        assert_eq!(classifier.classify("   \n").len(), 1);
    }

    #[test]
    fn test_confidence_curve() {
        assert_eq!(KeywordClassifier::confidence(1.0, true), 0.73);
        assert_eq!(KeywordClassifier::confidence(2.0, true), 0.91);
        assert_eq!(KeywordClassifier::confidence(3.0, true), 0.95);
        assert_eq!(KeywordClassifier::confidence(NO_MATCH_SCORE, false), 0.47);
    }

    #[test]
    fn test_matching_ignores_case_and_spacing() {
        let classifier = KeywordClassifier::new();
        let result = classifier.classify("Dash board 指標");
        assert_eq!(result[0].topic_id, 9);
        assert_eq!(result[0].related_keywords, vec!["指標", "dashboard"]);
    }
}
