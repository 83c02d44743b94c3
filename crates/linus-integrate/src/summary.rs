//! Rolling per-cell summary, kept between three and five bullets.

use linus_core::{Cell, Entry, SUMMARY_MAX, SUMMARY_MIN};

/// How many recent entries contribute bullets.
const RECENT_ENTRIES: usize = 3;

pub struct SummaryBuilder;

impl SummaryBuilder {
    /// Rebuild `cell.summary`, optionally headlining `latest`.
    pub fn refresh(cell: &mut Cell, latest: Option<&Entry>) {
        cell.summary = Self::build(cell, latest);
    }

    /// Candidate order: latest entry, up to three most recent entries
    /// (newest first), then the topic's default bullets. Deduplicated on the
    /// trimmed text, capped at [`SUMMARY_MAX`].
    pub fn build(cell: &Cell, latest: Option<&Entry>) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        if let Some(entry) = latest {
            candidates.push(format!("本次新增：{}", entry.snippet));
        }
        candidates.extend(
            cell.entries
                .iter()
                .rev()
                .take(RECENT_ENTRIES)
                .map(|entry| format!("{}：{}", entry.source, entry.snippet)),
        );
        candidates.extend(cell.definition.default_summary.iter().map(|s| s.to_string()));

        let mut bullets: Vec<String> = Vec::with_capacity(SUMMARY_MAX);
        for candidate in &candidates {
            let trimmed = candidate.trim();
            if trimmed.is_empty() || bullets.iter().any(|b| b == trimmed) {
                continue;
            }
            bullets.push(trimmed.to_string());
            if bullets.len() == SUMMARY_MAX {
                break;
            }
        }

        // Backfill from the raw candidates when dedup left too few.
        for candidate in &candidates {
            if bullets.len() >= SUMMARY_MIN {
                break;
            }
            if !bullets.contains(candidate) {
                bullets.push(candidate.clone());
            }
        }

        bullets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use linus_core::{EntryStatus, TopicDefinition, topic};

    fn entry(source: &str, snippet: &str) -> Entry {
        Entry {
            segment_id: format!("seg-{snippet}"),
            source: source.into(),
            snippet: snippet.into(),
            status: EntryStatus::NewEntry,
            related_topics: vec![],
            confidence: 0.9,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_latest_entry_headlines_summary() {
        let mut cell = Cell::new(topic(3).unwrap());
        let latest = entry("meeting", "合約 SOW 條款");
        cell.entries.push(latest.clone());
        SummaryBuilder::refresh(&mut cell, Some(&latest));

        assert_eq!(cell.summary[0], "本次新增：合約 SOW 條款");
        assert_eq!(cell.summary[1], "meeting：合約 SOW 條款");
        assert_eq!(cell.summary[2], "定義品牌差異化與收入結構");
        assert_eq!(cell.summary.len(), 5);
    }

    #[test]
    fn test_recent_entries_newest_first_and_capped() {
        let mut cell = Cell::new(topic(8).unwrap());
        for i in 0..6 {
            cell.entries.push(entry("ops", &format!("note {i}")));
        }
        let summary = SummaryBuilder::build(&cell, None);
        assert_eq!(
            summary[..3],
            ["ops：note 5".to_string(), "ops：note 4".into(), "ops：note 3".into()]
        );
        assert_eq!(summary.len(), 5);
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut cell = Cell::new(topic(1).unwrap());
        cell.entries.push(entry("a", "same"));
        cell.entries.push(entry("a", "same"));
        let summary = SummaryBuilder::build(&cell, None);
        assert_eq!(summary.iter().filter(|b| *b == "a：same").count(), 1);
    }

    #[test]
    fn test_bounds_hold_over_many_insertions() {
        let mut cell = Cell::new(topic(6).unwrap());
        for i in 0..50 {
            let e = entry("src", &format!("insight {}", i % 4));
            cell.entries.push(e.clone());
            SummaryBuilder::refresh(&mut cell, Some(&e));
            assert!((SUMMARY_MIN..=SUMMARY_MAX).contains(&cell.summary.len()));
        }
    }

    #[test]
    fn test_backfill_when_candidates_are_sparse() {
        static SPARSE: TopicDefinition = TopicDefinition {
            id: 1,
            title: "t",
            persona: "p",
            keywords: &[],
            default_summary: &["only", " only "],
        };
        let cell = Cell::new(&SPARSE);
        let summary = SummaryBuilder::build(&cell, None);
        assert_eq!(summary, vec!["only".to_string(), " only ".to_string()]);
    }
}
