//! Decision core: new entry, merge, or review.

use chrono::Utc;
use linus_core::text::{SNIPPET_MAX_CHARS, round2, snippet};
use linus_core::{
    Assignment, Entry, EntryStatus, GridState, LogAction, LogEntry, Outcome, OutcomeStatus,
    SUMMARY_MAX, SUMMARY_MIN, Segment, Thresholds, TopicId,
};
use tracing::{debug, warn};

use crate::similarity::SimilarityEngine;
use crate::summary::SummaryBuilder;

/// Owns the grid state and applies one classified segment at a time.
pub struct Integrator {
    state: GridState,
    thresholds: Thresholds,
    similarity: SimilarityEngine,
}

impl Integrator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self::with_state(GridState::new(), thresholds)
    }

    pub fn with_state(state: GridState, thresholds: Thresholds) -> Self {
        Self {
            state,
            thresholds,
            similarity: SimilarityEngine::new(),
        }
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GridState {
        &mut self.state
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Apply a segment and its assignments to the grid.
    ///
    /// Returns `None` when there is nothing to do: no assignments, or a
    /// primary topic outside the grid.
    pub fn process(&mut self, segment: &Segment, assignments: &[Assignment]) -> Option<Outcome> {
        let primary = assignments
            .iter()
            .find(|a| !a.secondary)
            .or_else(|| assignments.first())?;
        let related: Vec<TopicId> = assignments
            .iter()
            .filter(|a| a.secondary)
            .map(|a| a.topic_id)
            .collect();

        if !self.state.cells.contains_key(&primary.topic_id) {
            warn!(
                "Segment {} assigned to unknown grid {}, skipping",
                segment.id, primary.topic_id
            );
            return None;
        }

        let thresholds = self.thresholds;

        if primary.confidence < thresholds.review_confidence {
            self.push_review(segment, primary, &related);
            self.log(&segment.id, primary.topic_id, LogAction::MarkedReview, 0.0, "low_confidence");
            debug!("Segment {} -> grid {} review (low confidence)", segment.id, primary.topic_id);
            return Some(outcome(
                primary,
                OutcomeStatus::NeedsReview,
                related,
                "低置信度，需人工確認".into(),
            ));
        }

        let similarity = self
            .state
            .cells
            .get(&primary.topic_id)
            .map(|cell| self.similarity.max_similarity(&segment.text, cell))
            .unwrap_or(0.0);

        if similarity >= thresholds.merge {
            self.log(
                &segment.id,
                primary.topic_id,
                LogAction::Merged,
                similarity,
                &format!("similarity>={:.2}", thresholds.merge),
            );
            debug!("Segment {} -> grid {} merged ({:.2})", segment.id, primary.topic_id, similarity);
            return Some(outcome(
                primary,
                OutcomeStatus::Merged,
                related,
                "與既有條目相似，維持原條目".into(),
            ));
        }

        if similarity >= thresholds.gray_zone {
            self.push_review(segment, primary, &related);
            self.log(
                &segment.id,
                primary.topic_id,
                LogAction::MarkedReview,
                similarity,
                "similarity_in_gray_zone",
            );
            debug!("Segment {} -> grid {} review ({:.2})", segment.id, primary.topic_id, similarity);
            return Some(outcome(
                primary,
                OutcomeStatus::NeedsReview,
                related,
                format!(
                    "相似度介於 {:.2}~{:.2}，需人工決定",
                    thresholds.gray_zone, thresholds.merge
                ),
            ));
        }

        let entry = build_entry(segment, primary, EntryStatus::NewEntry, &related);
        if let Some(cell) = self.state.cells.get_mut(&primary.topic_id) {
            cell.entries.push(entry.clone());
            SummaryBuilder::refresh(cell, Some(&entry));
        }
        self.log(
            &segment.id,
            primary.topic_id,
            LogAction::Inserted,
            similarity,
            "new_entry_appended",
        );
        debug!("Segment {} -> grid {} new entry", segment.id, primary.topic_id);
        Some(outcome(
            primary,
            OutcomeStatus::NewEntry,
            related,
            "新增 insight 已寫入摘要".into(),
        ))
    }

    /// Rebuild any summary whose length is out of bounds. Returns how many
    /// cells were rebuilt.
    pub fn repair_summaries(&mut self) -> usize {
        let mut repaired = 0;
        for cell in self.state.cells.values_mut() {
            if !(SUMMARY_MIN..=SUMMARY_MAX).contains(&cell.summary.len()) {
                SummaryBuilder::refresh(cell, None);
                repaired += 1;
            }
        }
        repaired
    }

    fn push_review(&mut self, segment: &Segment, primary: &Assignment, related: &[TopicId]) {
        let entry = build_entry(segment, primary, EntryStatus::NeedsReview, related);
        if let Some(cell) = self.state.cells.get_mut(&primary.topic_id) {
            cell.needs_review.push(entry);
        }
    }

    fn log(&mut self, segment_id: &str, topic_id: TopicId, action: LogAction, similarity: f64, comment: &str) {
        self.state
            .logs
            .entry(segment_id.to_string())
            .or_default()
            .push(LogEntry {
                segment_id: segment_id.to_string(),
                topic_id,
                action,
                similarity: round2(similarity),
                comment: comment.to_string(),
                created_at: Utc::now(),
            });
    }
}

fn build_entry(
    segment: &Segment,
    assignment: &Assignment,
    status: EntryStatus,
    related: &[TopicId],
) -> Entry {
    Entry {
        segment_id: segment.id.clone(),
        source: segment.source.clone(),
        snippet: snippet(&segment.text, SNIPPET_MAX_CHARS),
        status,
        related_topics: related.to_vec(),
        confidence: assignment.confidence,
        created_at: Utc::now(),
    }
}

fn outcome(
    primary: &Assignment,
    status: OutcomeStatus,
    related_topics: Vec<TopicId>,
    summary_notes: String,
) -> Outcome {
    Outcome {
        topic_id: primary.topic_id,
        confidence: primary.confidence,
        status,
        related_topics,
        summary_notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn segment(id: &str, text: &str) -> Segment {
        Segment::new(id, "meeting-2024-09-20", text, Utc::now().fixed_offset())
    }

    fn primary(topic_id: TopicId, confidence: f64) -> Assignment {
        Assignment::primary(topic_id, confidence, vec![])
    }

    fn integrator() -> Integrator {
        Integrator::new(Thresholds::default())
    }

    #[test]
    fn test_no_assignments_is_noop() {
        let mut integrator = integrator();
        assert!(integrator.process(&segment("s", "text"), &[]).is_none());
        assert!(integrator.state().logs.is_empty());
    }

    #[test]
    fn test_new_entry_then_merge() {
        let mut integrator = integrator();
        let first = integrator
            .process(&segment("seg-agr", "合約 SOW 條款需要立即補進合作文件中。"), &[primary(3, 0.91)])
            .unwrap();
        assert_eq!(first.status, OutcomeStatus::NewEntry);

        let second = integrator
            .process(&segment("seg-merge", "SOW 合約條款要盡快補齊。"), &[primary(3, 0.91)])
            .unwrap();
        assert_eq!(second.status, OutcomeStatus::Merged);

        let cell = integrator.state().cell(3).unwrap();
        assert_eq!(cell.entries.len(), 1);
        assert!(cell.needs_review.is_empty());

        let log = integrator.state().logs_for("seg-merge");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, LogAction::Merged);
        assert_eq!(log[0].similarity, 1.0);
    }

    #[test]
    fn test_gray_zone_goes_to_review() {
        let mut integrator = integrator();
        // Grid 9 keywords: 數據 指標 dashboard 損益 知識庫 紀錄.
        integrator.process(&segment("a", "數據 指標 Dashboard 損益"), &[primary(9, 0.95)]);
        // Shares 3 of 4 keywords with the stored entry: overlap 0.75.
        let result = integrator
            .process(&segment("b", "數據 指標 Dashboard 知識庫"), &[primary(9, 0.95)])
            .unwrap();
        assert_eq!(result.status, OutcomeStatus::NeedsReview);

        let cell = integrator.state().cell(9).unwrap();
        assert_eq!(cell.entries.len(), 1);
        assert_eq!(cell.needs_review.len(), 1);
        assert_eq!(cell.needs_review[0].status, EntryStatus::NeedsReview);

        let log = &integrator.state().logs_for("b")[0];
        assert_eq!(log.comment, "similarity_in_gray_zone");
        assert_eq!(log.similarity, 0.75);
    }

    #[test]
    fn test_low_confidence_ignores_similarity() {
        let mut integrator = integrator();
        integrator.process(&segment("a", "合約 SOW"), &[primary(3, 0.9)]);
        let result = integrator
            .process(&segment("b", "合約 SOW"), &[primary(3, 0.59)])
            .unwrap();
        assert_eq!(result.status, OutcomeStatus::NeedsReview);
        let log = &integrator.state().logs_for("b")[0];
        assert_eq!(log.action, LogAction::MarkedReview);
        assert_eq!(log.comment, "low_confidence");
        assert_eq!(log.similarity, 0.0);
    }

    #[test]
    fn test_distinct_insight_is_new_entry() {
        let mut integrator = integrator();
        integrator.process(&segment("a", "合約 SOW"), &[primary(3, 0.9)]);
        let result = integrator
            .process(&segment("b", "品牌定位與收入差異"), &[primary(3, 0.9)])
            .unwrap();
        assert_eq!(result.status, OutcomeStatus::NewEntry);
        assert_eq!(integrator.state().cell(3).unwrap().entries.len(), 2);
    }

    #[test]
    fn test_primary_is_first_non_secondary() {
        let mut integrator = integrator();
        let assignments = vec![
            Assignment::secondary(8, 0.7),
            primary(3, 0.9),
            Assignment::secondary(2, 0.73),
        ];
        let result = integrator.process(&segment("s", "合約"), &assignments).unwrap();
        assert_eq!(result.topic_id, 3);
        assert_eq!(result.related_topics, vec![8, 2]);
        let entry = &integrator.state().cell(3).unwrap().entries[0];
        assert_eq!(entry.related_topics, vec![8, 2]);
    }

    #[test]
    fn test_all_secondary_uses_first() {
        let mut integrator = integrator();
        let assignments = vec![Assignment::secondary(6, 0.8), Assignment::secondary(7, 0.8)];
        let result = integrator.process(&segment("s", "平台"), &assignments).unwrap();
        assert_eq!(result.topic_id, 6);
    }

    #[test]
    fn test_unknown_topic_is_noop() {
        let mut integrator = integrator();
        assert!(integrator.process(&segment("s", "x"), &[primary(42, 0.9)]).is_none());
    }

    #[test]
    fn test_snippet_is_truncated() {
        let mut integrator = integrator();
        let text = format!("合約\n{}", "字".repeat(300));
        integrator.process(&segment("s", &text), &[primary(3, 0.9)]);
        let entry = &integrator.state().cell(3).unwrap().entries[0];
        assert_eq!(entry.snippet.chars().count(), SNIPPET_MAX_CHARS);
        assert!(!entry.snippet.contains('\n'));
    }

    #[test]
    fn test_logs_accumulate_per_segment_id() {
        let mut integrator = integrator();
        integrator.process(&segment("same", "合約 SOW"), &[primary(3, 0.9)]);
        integrator.process(&segment("same", "合約 SOW"), &[primary(3, 0.9)]);
        let actions: Vec<_> = integrator
            .state()
            .logs_for("same")
            .iter()
            .map(|l| l.action)
            .collect();
        assert_eq!(actions, vec![LogAction::Inserted, LogAction::Merged]);
    }

    #[test]
    fn test_custom_thresholds() {
        let mut integrator = Integrator::new(Thresholds {
            review_confidence: 0.95,
            ..Thresholds::default()
        });
        let result = integrator.process(&segment("s", "合約"), &[primary(3, 0.9)]).unwrap();
        assert_eq!(result.status, OutcomeStatus::NeedsReview);
    }

    #[test]
    fn test_repair_summaries() {
        let mut integrator = integrator();
        integrator.state_mut().cells.get_mut(&1).unwrap().summary = vec!["one".into()];
        assert_eq!(integrator.repair_summaries(), 1);
        assert_eq!(integrator.state().cell(1).unwrap().summary.len(), SUMMARY_MAX);
        assert_eq!(integrator.repair_summaries(), 0);
    }
}
