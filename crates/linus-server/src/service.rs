//! Service facade: classify, integrate, persist.

use linus_classify::Classifier;
use linus_core::{Error, LinusConfig, Result, Segment, SegmentStatus, Thresholds, TopicId, parse_timestamp};
use linus_integrate::Integrator;
use linus_store::{PersistentStore, StateDocument};
use parking_lot::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::views::{
    AllGridsView, GridView, SegmentBatch, SegmentBatchResponse, SegmentInput, SegmentLogView,
    SegmentResult,
};

/// Owns the classifier, the grid state and its store.
pub struct GridService {
    classifier: Classifier,
    integrator: RwLock<Integrator>,
    store: PersistentStore,
}

impl GridService {
    /// Build from configuration and hydrate from the state file.
    pub fn new(config: &LinusConfig) -> Self {
        let classifier = Classifier::from_config(config.remote_classifier.as_ref());
        let store = PersistentStore::open(&config.state_path, config.save_debounce);
        Self::with_parts(classifier, store, config.thresholds)
    }

    pub fn with_parts(classifier: Classifier, store: PersistentStore, thresholds: Thresholds) -> Self {
        let mut integrator = Integrator::new(thresholds);
        store.hydrate(integrator.state_mut());
        let repaired = integrator.repair_summaries();
        if repaired > 0 {
            info!("Rebuilt {} out-of-bounds summaries after hydration", repaired);
        }
        info!(
            "Grid service ready (classifier: {}, state: {})",
            classifier.kind(),
            store.path().display()
        );
        Self {
            classifier,
            integrator: RwLock::new(integrator),
            store,
        }
    }

    /// Classify and integrate each segment in order, then schedule one save.
    pub async fn post_segments(&self, batch: SegmentBatch) -> SegmentBatchResponse {
        let mut results = Vec::with_capacity(batch.segments.len());
        let mut tally = BatchTally::default();

        for input in batch.segments {
            let mut segment = build_segment(input);
            let classification = self.classifier.classify(&segment.text).await;
            if let Some(reason) = &classification.error {
                warn!("Classifier fell back for segment {}: {}", segment.id, reason);
            }
            segment.assignments = classification.assignments;

            let outcome = {
                let mut integrator = self.integrator.write();
                integrator.process(&segment, &segment.assignments)
            };
            if let Some(outcome) = &outcome {
                segment.status = SegmentStatus::from(outcome.status);
            }
            tally.record(segment.status);

            results.push(SegmentResult::new(
                &segment.id,
                &segment.text,
                segment.assignments,
                classification.classifier,
                classification.error,
                outcome,
            ));
        }

        info!(
            "Processed {} segments: {} new, {} merged, {} for review, {} skipped",
            results.len(),
            tally.new_entries,
            tally.merged,
            tally.needs_review,
            tally.skipped
        );

        let save = {
            let integrator = self.integrator.read();
            self.store.schedule_save_async(integrator.state())
        };
        if let Err(e) = save.await {
            warn!("Failed to save state: {}", e);
        }

        SegmentBatchResponse { results }
    }

    pub fn get_grid(&self, id: TopicId) -> Result<GridView> {
        let integrator = self.integrator.read();
        integrator
            .state()
            .cell(id)
            .map(GridView::from)
            .ok_or_else(|| Error::NotFound(format!("Unknown grid_id {}", id)))
    }

    pub fn get_all_grids(&self) -> AllGridsView {
        let integrator = self.integrator.read();
        AllGridsView {
            grids: integrator.state().cells.values().map(GridView::from).collect(),
        }
    }

    /// History for a segment id; empty when the id is unknown.
    pub fn get_segment_log(&self, segment_id: &str) -> SegmentLogView {
        let integrator = self.integrator.read();
        SegmentLogView {
            segment_id: segment_id.to_string(),
            history: integrator.state().logs_for(segment_id).to_vec(),
        }
    }

    pub fn export_state(&self) -> StateDocument {
        let integrator = self.integrator.read();
        self.store.snapshot(integrator.state())
    }

    /// Write any pending debounced save.
    pub fn shutdown(&self) -> Result<()> {
        self.store.flush()
    }
}

/// Per-batch counts by final segment status.
#[derive(Debug, Default, PartialEq, Eq)]
struct BatchTally {
    new_entries: usize,
    merged: usize,
    needs_review: usize,
    skipped: usize,
}

impl BatchTally {
    fn record(&mut self, status: SegmentStatus) {
        match status {
            SegmentStatus::NewEntry => self.new_entries += 1,
            SegmentStatus::Merged => self.merged += 1,
            SegmentStatus::NeedsReview => self.needs_review += 1,
            SegmentStatus::Pending => self.skipped += 1,
        }
    }
}

fn build_segment(input: SegmentInput) -> Segment {
    let id = input
        .segment_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(generate_segment_id);
    Segment::new(
        id,
        input.source.unwrap_or_else(|| "unknown".to_string()),
        input.text.unwrap_or_default(),
        parse_timestamp(input.timestamp.as_deref()),
    )
}

/// `seg-` followed by 8 hex characters.
pub fn generate_segment_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("seg-{}", &hex[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_shape() {
        let id = generate_segment_id();
        assert_eq!(id.len(), 12);
        assert!(id.starts_with("seg-"));
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_build_segment_defaults() {
        let segment = build_segment(SegmentInput::default());
        assert!(segment.id.starts_with("seg-"));
        assert_eq!(segment.source, "unknown");
        assert_eq!(segment.text, "");
        assert_eq!(segment.status, SegmentStatus::Pending);
    }

    #[test]
    fn test_tally_counts_each_status() {
        let mut tally = BatchTally::default();
        for status in [
            SegmentStatus::NewEntry,
            SegmentStatus::NewEntry,
            SegmentStatus::Merged,
            SegmentStatus::NeedsReview,
            SegmentStatus::Pending,
        ] {
            tally.record(status);
        }
        assert_eq!(
            tally,
            BatchTally {
                new_entries: 2,
                merged: 1,
                needs_review: 1,
                skipped: 1,
            }
        );
    }

    #[test]
    fn test_build_segment_keeps_caller_fields() {
        let segment = build_segment(SegmentInput {
            segment_id: Some("seg-agr".into()),
            source: Some("meeting-2024-09-20".into()),
            text: Some("合約".into()),
            timestamp: Some("2024-09-20T09:00:00Z".into()),
        });
        assert_eq!(segment.id, "seg-agr");
        assert_eq!(segment.timestamp.to_rfc3339(), "2024-09-20T09:00:00+00:00");
    }
}
