//! State file persistence.
//!
//! `schedule_save` coalesces bursts of mutations: the newest snapshot replaces
//! any pending one and a single delayed flush writes whatever is pending when
//! it fires. The pending slot and the timer handle share one mutex so arming
//! the timer and the timer clearing itself never interleave.
//!
//! Every snapshot carries a generation number. Physical writes are serialized
//! and a snapshot older than the last one written is discarded, so a late
//! timer write can never overwrite a newer flush.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use linus_core::{Error, GridState, Result, TopicId};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::types::{HydrateReport, StateDocument};

/// A state document tagged with the order it was taken in.
struct Snapshot {
    generation: u64,
    document: StateDocument,
}

#[derive(Default)]
struct PendingSave {
    snapshot: Option<Snapshot>,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    path: PathBuf,
    pending: Mutex<PendingSave>,
    next_generation: AtomicU64,
    /// Generation of the last snapshot on disk. Held for the whole write.
    written: Mutex<u64>,
    writes: AtomicUsize,
}

impl Inner {
    fn snapshot(&self, state: &GridState) -> Snapshot {
        Snapshot {
            generation: self.next_generation.fetch_add(1, Ordering::SeqCst) + 1,
            document: StateDocument::from(state),
        }
    }

    /// Write a snapshot unless a newer one already reached disk.
    fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let mut written = self.written.lock();
        if snapshot.generation < *written {
            debug!(
                "Skipping superseded snapshot {} (on disk: {})",
                snapshot.generation, *written
            );
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_vec_pretty(&snapshot.document)?;
        std::fs::write(&self.path, data)?;
        *written = snapshot.generation;
        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    /// Timer callback: take the pending snapshot, clear the timer, write.
    fn flush_pending(&self) {
        let snapshot = {
            let mut pending = self.pending.lock();
            pending.timer = None;
            pending.snapshot.take()
        };
        if let Some(snapshot) = snapshot {
            if let Err(e) = self.write(&snapshot) {
                warn!("Debounced save to {} failed: {}", self.path.display(), e);
            }
        }
    }
}

/// Run a blocking write on the blocking pool.
async fn write_blocking(inner: Arc<Inner>, snapshot: Snapshot) -> Result<()> {
    tokio::task::spawn_blocking(move || inner.write(&snapshot))
        .await
        .map_err(|e| Error::Internal(format!("state write task failed: {}", e)))?
}

/// Loads, snapshots and saves the grid state file.
pub struct PersistentStore {
    inner: Arc<Inner>,
    debounce: Duration,
    loaded: StateDocument,
}

impl PersistentStore {
    /// Open the store, reading whatever state the file currently holds.
    pub fn open(path: impl AsRef<Path>, debounce: Duration) -> Self {
        let path = path.as_ref().to_path_buf();
        let loaded = Self::load(&path);
        Self {
            inner: Arc::new(Inner {
                path,
                pending: Mutex::new(PendingSave::default()),
                next_generation: AtomicU64::new(0),
                written: Mutex::new(0),
                writes: AtomicUsize::new(0),
            }),
            debounce,
            loaded,
        }
    }

    /// Read a state file. Missing or corrupt files yield an empty document.
    pub fn load(path: &Path) -> StateDocument {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No state file at {}, starting empty", path.display());
                return StateDocument::default();
            }
            Err(e) => {
                warn!("Cannot read state file {}: {}", path.display(), e);
                return StateDocument::default();
            }
        };
        match serde_json::from_str(&data) {
            Ok(document) => document,
            Err(e) => {
                warn!("Corrupt state file {}, starting empty: {}", path.display(), e);
                StateDocument::default()
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Number of physical writes performed so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Copy the loaded document into `state`.
    ///
    /// Cells whose key is not a known grid id are ignored. An absent or empty
    /// summary leaves the cell's current summary in place.
    pub fn hydrate(&self, state: &mut GridState) -> HydrateReport {
        let mut report = HydrateReport::default();

        for (key, record) in &self.loaded.cells {
            let cell = match key.trim().parse::<TopicId>().ok().and_then(|id| state.cells.get_mut(&id)) {
                Some(cell) => cell,
                None => {
                    warn!("Ignoring persisted cell with unknown grid id {:?}", key);
                    continue;
                }
            };
            if !record.summary.is_empty() {
                cell.summary = record.summary.clone();
            }
            cell.entries = record.entries.clone();
            cell.needs_review = record.needs_review.clone();
            report.cells += 1;
            report.entries += cell.entries.len();
            report.needs_review += cell.needs_review.len();
        }

        for (segment_id, records) in &self.loaded.logs {
            let history = records
                .iter()
                .cloned()
                .map(|mut log| {
                    log.segment_id = segment_id.clone();
                    log
                })
                .collect();
            state.logs.insert(segment_id.clone(), history);
            report.segments_logged += 1;
        }

        info!(
            "Hydrated state: cells={}, entries={}, needs_review={}, segments={}",
            report.cells, report.entries, report.needs_review, report.segments_logged
        );
        report
    }

    /// Serialize the full state without touching disk.
    pub fn snapshot(&self, state: &GridState) -> StateDocument {
        StateDocument::from(state)
    }

    /// Write the full state immediately, bypassing the debounce window.
    pub fn save_now(&self, state: &GridState) -> Result<()> {
        self.inner.write(&self.inner.snapshot(state))
    }

    /// Queue a save. With a zero window, or outside a Tokio runtime, this
    /// writes synchronously on the calling thread.
    pub fn schedule_save(&self, state: &GridState) -> Result<()> {
        let snapshot = self.inner.snapshot(state);
        if self.debounce.is_zero() {
            return self.inner.write(&snapshot);
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                self.arm(&runtime, snapshot);
                Ok(())
            }
            Err(_) => self.inner.write(&snapshot),
        }
    }

    /// Async form of [`schedule_save`](Self::schedule_save) for request
    /// handlers.
    ///
    /// The snapshot is taken before this returns, so the caller may release
    /// its state lock before awaiting. A zero window writes on the blocking
    /// pool and the returned future resolves once the file is written.
    pub fn schedule_save_async(
        &self,
        state: &GridState,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        let snapshot = self.inner.snapshot(state);
        let direct = match tokio::runtime::Handle::try_current() {
            Ok(runtime) if !self.debounce.is_zero() => {
                self.arm(&runtime, snapshot);
                None
            }
            _ => Some(snapshot),
        };
        let inner = Arc::clone(&self.inner);
        async move {
            match direct {
                Some(snapshot) => write_blocking(inner, snapshot).await,
                None => Ok(()),
            }
        }
    }

    /// Replace the pending snapshot and start the timer if none is running.
    fn arm(&self, runtime: &tokio::runtime::Handle, snapshot: Snapshot) {
        let mut pending = self.pending_lock();
        pending.snapshot = Some(snapshot);
        if pending.timer.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let delay = self.debounce;
        pending.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let flushed = tokio::task::spawn_blocking(move || inner.flush_pending()).await;
            if let Err(e) = flushed {
                warn!("Debounced save task failed: {}", e);
            }
        }));
    }

    /// Cancel any armed timer and write the pending snapshot now.
    pub fn flush(&self) -> Result<()> {
        let snapshot = {
            let mut pending = self.pending_lock();
            if let Some(timer) = pending.timer.take() {
                timer.abort();
            }
            pending.snapshot.take()
        };
        match snapshot {
            Some(snapshot) => self.inner.write(&snapshot),
            None => Ok(()),
        }
    }

    fn pending_lock(&self) -> parking_lot::MutexGuard<'_, PendingSave> {
        self.inner.pending.lock()
    }
}
