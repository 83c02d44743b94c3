//! Grid data model: assignments, segments, entries, cells and the audit log.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::text::round2;
use crate::topics::{TOPICS, TopicDefinition, TopicId};

/// Fewest bullets a cell summary may hold.
pub const SUMMARY_MIN: usize = 3;
/// Most bullets a cell summary may hold.
pub const SUMMARY_MAX: usize = 5;

/// A classifier's verdict for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(rename = "grid_id")]
    pub topic_id: TopicId,
    pub confidence: f64,
    pub secondary: bool,
    #[serde(default)]
    pub related_keywords: Vec<String>,
}

impl Assignment {
    pub fn primary(topic_id: TopicId, confidence: f64, related_keywords: Vec<String>) -> Self {
        Self {
            topic_id,
            confidence,
            secondary: false,
            related_keywords,
        }
    }

    pub fn secondary(topic_id: TopicId, confidence: f64) -> Self {
        Self {
            topic_id,
            confidence,
            secondary: true,
            related_keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Pending,
    NewEntry,
    Merged,
    NeedsReview,
}

/// One unit of submitted text.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub id: String,
    pub source: String,
    pub text: String,
    pub timestamp: DateTime<FixedOffset>,
    pub assignments: Vec<Assignment>,
    pub status: SegmentStatus,
}

impl Segment {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            text: text.into(),
            timestamp,
            assignments: Vec::new(),
            status: SegmentStatus::Pending,
        }
    }
}

/// Parse a caller-supplied ISO-8601 timestamp.
///
/// A trailing `Z` is accepted as `+00:00`; offset-less values are taken as
/// UTC. Missing or unparseable input yields the current UTC time.
pub fn parse_timestamp(raw: Option<&str>) -> DateTime<FixedOffset> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(parse_iso8601)
        .unwrap_or_else(|| Utc::now().fixed_offset())
}

fn parse_iso8601(value: &str) -> Option<DateTime<FixedOffset>> {
    let normalized = match value.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => value.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    NewEntry,
    NeedsReview,
}

impl Default for EntryStatus {
    fn default() -> Self {
        Self::NewEntry
    }
}

/// An insight filed into a cell. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub segment_id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub status: EntryStatus,
    #[serde(rename = "related_grids", default)]
    pub related_topics: Vec<TopicId>,
    #[serde(default, serialize_with = "serialize_round2")]
    pub confidence: f64,
    #[serde(default = "Utc::now", deserialize_with = "deserialize_lenient_time")]
    pub created_at: DateTime<Utc>,
}

/// Knowledge store for one topic.
#[derive(Debug, Clone)]
pub struct Cell {
    pub definition: &'static TopicDefinition,
    /// Between [`SUMMARY_MIN`] and [`SUMMARY_MAX`] bullets.
    pub summary: Vec<String>,
    /// Accepted insights, in insertion order.
    pub entries: Vec<Entry>,
    pub needs_review: Vec<Entry>,
}

impl Cell {
    pub fn new(definition: &'static TopicDefinition) -> Self {
        Self {
            definition,
            summary: definition
                .default_summary
                .iter()
                .take(SUMMARY_MAX)
                .map(|s| s.to_string())
                .collect(),
            entries: Vec::new(),
            needs_review: Vec::new(),
        }
    }

    pub fn id(&self) -> TopicId {
        self.definition.id
    }

    /// Sorted union of the related topics of all accepted entries.
    pub fn related_topics(&self) -> Vec<TopicId> {
        let mut related: Vec<TopicId> = self
            .entries
            .iter()
            .flat_map(|e| e.related_topics.iter().copied())
            .collect();
        related.sort_unstable();
        related.dedup();
        related
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Inserted,
    Merged,
    MarkedReview,
}

/// Audit record of one integration decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Implied by the key the record is stored under.
    #[serde(skip_serializing, default)]
    pub segment_id: String,
    #[serde(rename = "grid_id")]
    pub topic_id: TopicId,
    pub action: LogAction,
    #[serde(default, serialize_with = "serialize_round2")]
    pub similarity: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default = "Utc::now", deserialize_with = "deserialize_lenient_time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    NewEntry,
    Merged,
    NeedsReview,
}

impl From<OutcomeStatus> for SegmentStatus {
    fn from(status: OutcomeStatus) -> Self {
        match status {
            OutcomeStatus::NewEntry => SegmentStatus::NewEntry,
            OutcomeStatus::Merged => SegmentStatus::Merged,
            OutcomeStatus::NeedsReview => SegmentStatus::NeedsReview,
        }
    }
}

/// What the integrator did with a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(rename = "grid_id")]
    pub topic_id: TopicId,
    pub confidence: f64,
    pub status: OutcomeStatus,
    #[serde(rename = "related_grids")]
    pub related_topics: Vec<TopicId>,
    pub summary_notes: String,
}

/// All mutable grid state: one cell per topic plus the per-segment log.
#[derive(Debug, Clone)]
pub struct GridState {
    pub cells: BTreeMap<TopicId, Cell>,
    pub logs: BTreeMap<String, Vec<LogEntry>>,
}

impl GridState {
    pub fn new() -> Self {
        Self {
            cells: TOPICS.iter().map(|t| (t.id, Cell::new(t))).collect(),
            logs: BTreeMap::new(),
        }
    }

    pub fn cell(&self, id: TopicId) -> Option<&Cell> {
        self.cells.get(&id)
    }

    pub fn logs_for(&self, segment_id: &str) -> &[LogEntry] {
        self.logs.get(segment_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for GridState {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize_round2<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round2(*value))
}

fn deserialize_lenient_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(parse_timestamp(raw.as_deref()).with_timezone(&Utc))
}
