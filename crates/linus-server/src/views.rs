//! Response shapes for the HTTP API.

use chrono::{DateTime, Utc};
use linus_classify::ClassifierKind;
use linus_core::text::round2;
use linus_core::{Assignment, Cell, Entry, LogEntry, Outcome, TopicId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mandala::mandala;

/// Characters of segment text echoed back in a result.
const RESULT_SNIPPET_CHARS: usize = 80;

/// One submitted segment. Everything but the text is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentInput {
    #[serde(default)]
    pub segment_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentBatch {
    #[serde(default)]
    pub segments: Vec<SegmentInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentResult {
    pub segment_id: String,
    pub grid_assignments: Vec<Assignment>,
    pub snippet: String,
    pub classifier: ClassifierKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Absent when the segment produced no assignments.
    #[serde(flatten)]
    pub outcome: Option<Outcome>,
}

impl SegmentResult {
    pub fn new(
        segment_id: &str,
        text: &str,
        assignments: Vec<Assignment>,
        classifier: ClassifierKind,
        error: Option<String>,
        mut outcome: Option<Outcome>,
    ) -> Self {
        if let (Some(reason), Some(outcome)) = (error.as_deref(), outcome.as_mut()) {
            outcome.summary_notes = format!("(Gemini fallback: {}) {}", reason, outcome.summary_notes);
        }
        Self {
            segment_id: segment_id.to_string(),
            grid_assignments: assignments,
            snippet: text.replace('\n', " ").chars().take(RESULT_SNIPPET_CHARS).collect(),
            classifier,
            error,
            outcome,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentBatchResponse {
    pub results: Vec<SegmentResult>,
}

/// Review queue item as shown to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub segment_id: String,
    pub confidence: f64,
    pub snippet: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Entry> for ReviewView {
    fn from(entry: &Entry) -> Self {
        Self {
            segment_id: entry.segment_id.clone(),
            confidence: round2(entry.confidence),
            snippet: entry.snippet.clone(),
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GridView {
    pub grid_id: TopicId,
    pub title: &'static str,
    pub persona: &'static str,
    pub summary: Vec<String>,
    pub entries: Vec<Entry>,
    pub needs_review: Vec<ReviewView>,
    pub related_grids: Vec<TopicId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandala: Option<&'static Value>,
}

impl From<&Cell> for GridView {
    fn from(cell: &Cell) -> Self {
        Self {
            grid_id: cell.id(),
            title: cell.definition.title,
            persona: cell.definition.persona,
            summary: cell.summary.clone(),
            entries: cell.entries.clone(),
            needs_review: cell.needs_review.iter().map(ReviewView::from).collect(),
            related_grids: cell.related_topics(),
            mandala: mandala(cell.id()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AllGridsView {
    pub grids: Vec<GridView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentLogView {
    pub segment_id: String,
    pub history: Vec<LogEntry>,
}
