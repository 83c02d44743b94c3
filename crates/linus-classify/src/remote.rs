//! Gemini-backed classification.
//!
//! One fixed prompt (the grid cheat sheet) is built at construction. Each call
//! sends the prompt plus the paragraph and expects JSON of the form
//! `{"primary":{"grid","confidence","notes"},"secondary":[{"grid","confidence"}],"related_keywords":[..]}`.

use linus_core::text::round2;
use linus_core::{Assignment, DEFAULT_TOPIC_ID, RemoteClassifierConfig, TOPICS, TopicId, topic};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::keyword::KeywordClassifier;
use crate::{Classification, ClassificationError, ClassifierKind};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1/models";

/// Confidence assumed when the model omits one.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Remote classifier decorating the keyword classifier as its fallback.
pub struct RemoteClassifier {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    prompt: String,
    fallback: KeywordClassifier,
}

impl RemoteClassifier {
    pub fn new(config: &RemoteClassifierConfig) -> Result<Self, ClassificationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClassificationError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/{}:generateContent", GEMINI_BASE_URL, config.model),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            prompt: build_prompt(),
            fallback: KeywordClassifier::new(),
        })
    }

    /// Point the classifier at a different `generateContent` URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Classify remotely, falling back to keywords on any failure.
    pub async fn classify(&self, text: &str) -> Classification {
        match self.try_classify(text).await {
            Ok(assignments) => Classification {
                assignments,
                classifier: ClassifierKind::Gemini,
                error: None,
            },
            Err(e) => {
                warn!("Gemini classification failed, using keyword fallback: {}", e);
                Classification {
                    assignments: self.fallback.classify(text),
                    classifier: ClassifierKind::RuleBasedFallback,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Classify remotely without fallback. Blank text yields no assignments.
    pub async fn try_classify(&self, text: &str) -> Result<Vec<Assignment>, ClassificationError> {
        let paragraph = text.trim();
        if paragraph.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "contents": [{
                "parts": [
                    {"text": self.prompt},
                    {"text": format!("Paragraph: {}", paragraph)},
                ]
            }],
            "safetySettings": [],
            "generationConfig": {"temperature": 0.1, "topP": 0.9, "topK": 32},
        });

        debug!("Classifying with Gemini model {}", self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassificationError::Request(format!("timed out: {}", e))
                } else {
                    ClassificationError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassificationError::Api { status, body });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ClassificationError::Parse(e.to_string()))?;

        let answer = data["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                ClassificationError::Parse("missing candidates[0].content.parts[0].text".into())
            })?;

        parse_classification(answer)
    }
}

fn build_prompt() -> String {
    let cheat_sheet: Vec<String> = TOPICS
        .iter()
        .map(|t| {
            format!(
                "{}. {} - Persona: {} - Keywords: {}",
                t.id,
                t.title,
                t.persona,
                t.keywords.join(", ")
            )
        })
        .collect();

    format!(
        "You classify meeting notes for a ski education platform into a nine-cell grid.\n\
         Pick the primary grid (1-9) for the paragraph and, optionally, secondary grids.\n\
         Reply with JSON only, shaped as \
         {{\"primary\":{{\"grid\":number,\"confidence\":0-1,\"notes\":string}},\
         \"secondary\":[{{\"grid\":number,\"confidence\":0-1}}],\"related_keywords\":[string]}}\n\
         Use confidence above 0.8 only when sure. When unsure, choose the closest grid \
         by WHY/WHO/WHAT and keep confidence at or below 0.6.\n\
         Grids:\n{}",
        cheat_sheet.join("\n")
    )
}

/// Turn the model's JSON answer into assignments, primary first.
///
/// Missing primary fields default to the default topic at 0.5. A secondary
/// without a usable grid id is dropped.
pub fn parse_classification(answer: &str) -> Result<Vec<Assignment>, ClassificationError> {
    let parsed: Value = serde_json::from_str(answer.trim())
        .map_err(|e| ClassificationError::Parse(e.to_string()))?;
    if !parsed.is_object() {
        return Err(ClassificationError::Parse("expected a JSON object".into()));
    }

    let primary = &parsed["primary"];
    let related_keywords: Vec<String> = parsed["related_keywords"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let mut assignments = vec![Assignment::primary(
        topic_id_of(&primary["grid"]).unwrap_or(DEFAULT_TOPIC_ID),
        confidence_of(&primary["confidence"]),
        related_keywords,
    )];

    if let Some(secondaries) = parsed["secondary"].as_array() {
        for item in secondaries {
            match topic_id_of(&item["grid"]) {
                Some(topic_id) => assignments.push(Assignment::secondary(
                    topic_id,
                    confidence_of(&item["confidence"]),
                )),
                None => debug!("Dropping malformed secondary assignment: {}", item),
            }
        }
    }

    Ok(assignments)
}

fn topic_id_of(value: &Value) -> Option<TopicId> {
    let raw = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    let id = TopicId::try_from(raw).ok()?;
    topic(id).map(|t| t.id)
}

fn confidence_of(value: &Value) -> f64 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
    .unwrap_or(DEFAULT_CONFIDENCE);
    round2(raw.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::routing::post;
    use axum::{Json, Router};

    fn config(timeout: Duration) -> RemoteClassifierConfig {
        RemoteClassifierConfig {
            api_key: "test-key".into(),
            model: "gemini-test".into(),
            timeout,
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/generate", addr)
    }

    fn envelope(answer: &str) -> Value {
        json!({"candidates": [{"content": {"parts": [{"text": answer}]}}]})
    }

    #[test]
    fn test_parse_full_answer() {
        let answer = r#"{"primary":{"grid":3,"confidence":0.874,"notes":"contract"},
            "secondary":[{"grid":8,"confidence":0.4}],"related_keywords":["合約","SOW"]}"#;
        let assignments = parse_classification(answer).unwrap();
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].topic_id, 3);
        assert_eq!(assignments[0].confidence, 0.87);
        assert!(!assignments[0].secondary);
        assert_eq!(assignments[0].related_keywords, vec!["合約", "SOW"]);
        assert_eq!(assignments[1].topic_id, 8);
        assert!(assignments[1].secondary);
    }

    #[test]
    fn test_parse_missing_fields_use_defaults() {
        let assignments = parse_classification("{}").unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].topic_id, DEFAULT_TOPIC_ID);
        assert_eq!(assignments[0].confidence, 0.5);
    }

    #[test]
    fn test_parse_drops_malformed_secondary_only() {
        let answer = r#"{"primary":{"grid":"6","confidence":2.5},
            "secondary":[{"confidence":0.7},{"grid":"x"},{"grid":42},{"grid":9}]}"#;
        let assignments = parse_classification(answer).unwrap();
        let ids: Vec<_> = assignments.iter().map(|a| a.topic_id).collect();
        assert_eq!(ids, vec![6, 9]);
        assert_eq!(assignments[0].confidence, 1.0);
        assert_eq!(assignments[1].confidence, 0.5);
    }

    #[test]
    fn test_parse_out_of_range_primary_uses_default_topic() {
        let assignments = parse_classification(r#"{"primary":{"grid":12}}"#).unwrap();
        assert_eq!(assignments[0].topic_id, DEFAULT_TOPIC_ID);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_classification("I think it is grid 3"),
            Err(ClassificationError::Parse(_))
        ));
        assert!(matches!(parse_classification("[1,2]"), Err(ClassificationError::Parse(_))));
    }

    #[test]
    fn test_prompt_lists_every_grid() {
        let classifier = RemoteClassifier::new(&config(Duration::from_secs(1))).unwrap();
        for t in TOPICS.iter() {
            assert!(classifier.prompt().contains(t.title));
        }
    }

    #[tokio::test]
    async fn test_remote_success() {
        let router = Router::new().route(
            "/generate",
            post(|| async {
                Json(envelope(r#"{"primary":{"grid":7,"confidence":0.9,"notes":""}}"#))
            }),
        );
        let url = serve(router).await;
        let classifier = RemoteClassifier::new(&config(Duration::from_secs(5)))
            .unwrap()
            .with_endpoint(url);

        let result = classifier.classify("社群內容排程").await;
        assert_eq!(result.classifier, ClassifierKind::Gemini);
        assert!(result.error.is_none());
        assert_eq!(result.assignments[0].topic_id, 7);
    }

    #[tokio::test]
    async fn test_malformed_response_falls_back() {
        let router = Router::new().route(
            "/generate",
            post(|| async { Json(envelope("not json at all")) }),
        );
        let url = serve(router).await;
        let classifier = RemoteClassifier::new(&config(Duration::from_secs(5)))
            .unwrap()
            .with_endpoint(url);

        let result = classifier.classify("平台後台通知").await;
        assert_eq!(result.classifier, ClassifierKind::RuleBasedFallback);
        assert!(result.error.unwrap().contains("parsing"));
        assert_eq!(result.assignments[0].topic_id, 6);
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let router = Router::new().route(
            "/generate",
            post(|| async { (axum::http::StatusCode::FORBIDDEN, "bad key") }),
        );
        let url = serve(router).await;
        let classifier = RemoteClassifier::new(&config(Duration::from_secs(5)))
            .unwrap()
            .with_endpoint(url);

        let err = classifier.try_classify("平台").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let router = Router::new().route(
            "/generate",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(envelope("{}"))
            }),
        );
        let url = serve(router).await;
        let classifier = RemoteClassifier::new(&config(Duration::from_millis(200)))
            .unwrap()
            .with_endpoint(url);

        let result = classifier.classify("數據 指標").await;
        assert_eq!(result.classifier, ClassifierKind::RuleBasedFallback);
        assert_eq!(result.assignments[0].topic_id, 9);
    }

    #[tokio::test]
    async fn test_blank_text_skips_the_call() {
        let classifier = RemoteClassifier::new(&config(Duration::from_millis(50)))
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/unreachable");
        let result = classifier.classify("   ").await;
        assert_eq!(result.classifier, ClassifierKind::Gemini);
        assert!(result.assignments.is_empty());
    }
}
