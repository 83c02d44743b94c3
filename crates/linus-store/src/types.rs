//! On-disk document layout.
//!
//! `{"cells": {"<grid_id>": {summary, entries, needs_review}}, "logs": {"<segment_id>": [..]}}`

use std::collections::BTreeMap;

use linus_core::{Cell, Entry, GridState, LogEntry};
use serde::{Deserialize, Serialize};

/// Persisted form of one cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    #[serde(default)]
    pub summary: Vec<String>,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub needs_review: Vec<Entry>,
}

impl From<&Cell> for CellRecord {
    fn from(cell: &Cell) -> Self {
        Self {
            summary: cell.summary.clone(),
            entries: cell.entries.clone(),
            needs_review: cell.needs_review.clone(),
        }
    }
}

/// The whole state file. Every save rewrites all of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub cells: BTreeMap<String, CellRecord>,
    #[serde(default)]
    pub logs: BTreeMap<String, Vec<LogEntry>>,
}

impl From<&GridState> for StateDocument {
    fn from(state: &GridState) -> Self {
        Self {
            cells: state
                .cells
                .iter()
                .map(|(id, cell)| (id.to_string(), CellRecord::from(cell)))
                .collect(),
            logs: state.logs.clone(),
        }
    }
}

/// Counts reported after hydrating a state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HydrateReport {
    pub cells: usize,
    pub entries: usize,
    pub needs_review: usize,
    pub segments_logged: usize,
}
