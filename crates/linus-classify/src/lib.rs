//! Segment classification against the nine grid topics.
//!
//! [`KeywordClassifier`] is deterministic and always available.
//! [`RemoteClassifier`] asks Gemini and degrades to the keyword scorer on any
//! failure. [`Classifier`] is the sum of the two.

pub mod keyword;
pub mod remote;

use linus_core::{Assignment, RemoteClassifierConfig};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

pub use keyword::KeywordClassifier;
pub use remote::RemoteClassifier;

/// Failure of the remote classifier. Never fatal: callers fall back.
#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    Parse(String),
}

/// Which classifier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    RuleBased,
    Gemini,
    RuleBasedFallback,
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RuleBased => write!(f, "rule_based"),
            Self::Gemini => write!(f, "gemini"),
            Self::RuleBasedFallback => write!(f, "rule_based_fallback"),
        }
    }
}

/// Assignments plus provenance. Assignments are ordered primary-first.
#[derive(Debug, Clone)]
pub struct Classification {
    pub assignments: Vec<Assignment>,
    pub classifier: ClassifierKind,
    /// Remote failure message when the keyword fallback was used.
    pub error: Option<String>,
}

pub enum Classifier {
    Keyword(KeywordClassifier),
    Remote(RemoteClassifier),
}

impl Classifier {
    /// Remote classifier when configured and constructible, keyword otherwise.
    pub fn from_config(remote: Option<&RemoteClassifierConfig>) -> Self {
        match remote {
            Some(config) => match RemoteClassifier::new(config) {
                Ok(classifier) => Self::Remote(classifier),
                Err(e) => {
                    warn!("Remote classifier unavailable, using keywords only: {}", e);
                    Self::Keyword(KeywordClassifier::new())
                }
            },
            None => Self::Keyword(KeywordClassifier::new()),
        }
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            Self::Keyword(_) => ClassifierKind::RuleBased,
            Self::Remote(_) => ClassifierKind::Gemini,
        }
    }

    pub async fn classify(&self, text: &str) -> Classification {
        match self {
            Self::Keyword(keyword) => Classification {
                assignments: keyword.classify(text),
                classifier: ClassifierKind::RuleBased,
                error: None,
            },
            Self::Remote(remote) => remote.classify(text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(ClassifierKind::RuleBasedFallback.to_string(), "rule_based_fallback");
        assert_eq!(
            serde_json::to_value(ClassifierKind::Gemini).unwrap(),
            serde_json::json!("gemini")
        );
    }

    #[test]
    fn test_no_remote_config_means_keyword() {
        let classifier = Classifier::from_config(None);
        assert_eq!(classifier.kind(), ClassifierKind::RuleBased);
    }

    #[tokio::test]
    async fn test_keyword_classification_has_no_error() {
        let classifier = Classifier::from_config(None);
        let result = classifier.classify("平台後台通知").await;
        assert_eq!(result.classifier, ClassifierKind::RuleBased);
        assert!(result.error.is_none());
        assert_eq!(result.assignments[0].topic_id, 6);
    }
}
