//! Background snapshot writer.
//!
//! A single Tokio task owns the snapshot file. Mutators hand it complete
//! serialized snapshots through a [`watch`] channel, which holds at most one
//! pending snapshot: a newer snapshot replaces an older unwritten one, and
//! handing one over never blocks. Every write replaces the whole file via a
//! temporary file and a rename.
//!
//! Snapshots carry a generation number. Callers that need to know a given
//! state reached the disk wait on [`SnapshotWriter::flush`].

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Retry policy for snapshot writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Attempts per snapshot before the write is reported as failed.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled after each failed attempt.
    pub initial_backoff: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

/// Outcome of a failed or abandoned flush.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    /// All write attempts for a snapshot failed.
    #[error("failed to write snapshot generation {generation} to {path}: {message}")]
    WriteFailed {
        /// Generation of the snapshot that was not written.
        generation: u64,
        /// Target file.
        path: String,
        /// Last I/O error.
        message: String,
    },

    /// The writer task exited before the requested generation was written.
    #[error("snapshot writer has stopped")]
    WriterStopped,
}

/// A complete serialized state of the token store.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Position of this snapshot in mutation order.
    pub generation: u64,
    /// Serialized records.
    pub bytes: Arc<[u8]>,
}

impl Snapshot {
    /// Wrap serialized bytes for the given generation.
    pub fn new(generation: u64, bytes: Vec<u8>) -> Self {
        Self {
            generation,
            bytes: bytes.into(),
        }
    }
}

/// Result of the most recent write attempt, published by the writer task.
#[derive(Debug, Clone, Default)]
struct FlushState {
    generation: u64,
    error: Option<PersistenceError>,
}

/// Handle to the writer task.
pub struct SnapshotWriter {
    path: PathBuf,
    snapshots: watch::Sender<Snapshot>,
    flushed: watch::Receiver<FlushState>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SnapshotWriter {
    /// Spawn the writer task for `path`.
    ///
    /// `generation` is the generation of the state already on disk; only
    /// later snapshots are written. Must be called within a Tokio runtime.
    pub fn spawn(path: PathBuf, config: WriterConfig, generation: u64) -> Self {
        let (snapshots, snapshot_rx) = watch::channel(Snapshot::new(generation, Vec::new()));
        let (flushed_tx, flushed) = watch::channel(FlushState {
            generation,
            error: None,
        });
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(run(
            path.clone(),
            config,
            snapshot_rx,
            flushed_tx,
            stop_rx,
        ));

        Self {
            path,
            snapshots,
            flushed,
            stop: Mutex::new(Some(stop_tx)),
            task: Mutex::new(Some(task)),
        }
    }

    /// File the snapshots are written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue a snapshot for writing, replacing any unwritten one.
    ///
    /// Never blocks and never fails; a snapshot submitted after shutdown
    /// is dropped with a warning.
    pub fn submit(&self, snapshot: Snapshot) {
        if self.snapshots.is_closed() {
            warn!(
                generation = snapshot.generation,
                "snapshot writer stopped, change kept in memory only"
            );
        }
        self.snapshots.send_replace(snapshot);
    }

    /// Wait until a snapshot of at least `generation` has been processed.
    ///
    /// Returns the outcome of the write that covered it.
    pub async fn flush(&self, generation: u64) -> Result<(), PersistenceError> {
        let mut flushed = self.flushed.clone();
        let outcome = flushed
            .wait_for(|state| state.generation >= generation)
            .await
            .map_err(|_| PersistenceError::WriterStopped)?
            .error
            .clone();
        match outcome {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Write any pending snapshot, then stop the writer task.
    ///
    /// Idempotent; later calls return immediately.
    pub async fn shutdown(&self) {
        let stop = self
            .stop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(stop) = stop {
            let _ = stop.send(());
        }

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "snapshot writer task failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Writer task
// ---------------------------------------------------------------------------

async fn run(
    path: PathBuf,
    config: WriterConfig,
    mut snapshots: watch::Receiver<Snapshot>,
    flushed: watch::Sender<FlushState>,
    mut stop: oneshot::Receiver<()>,
) {
    debug!(path = %path.display(), "snapshot writer started");

    loop {
        tokio::select! {
            biased;

            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                persist(&path, config, snapshot, &flushed).await;
            }
            _ = &mut stop => {
                if snapshots.has_changed().unwrap_or(false) {
                    let snapshot = snapshots.borrow_and_update().clone();
                    persist(&path, config, snapshot, &flushed).await;
                }
                break;
            }
        }
    }

    debug!(path = %path.display(), "snapshot writer stopped");
}

/// Write one snapshot with retries and publish the outcome.
async fn persist(
    path: &Path,
    config: WriterConfig,
    snapshot: Snapshot,
    flushed: &watch::Sender<FlushState>,
) {
    let max_attempts = config.max_attempts.max(1);
    let mut backoff = config.initial_backoff;
    let mut attempt = 1;

    let error = loop {
        match write_replace(path, &snapshot.bytes).await {
            Ok(()) => {
                debug!(
                    generation = snapshot.generation,
                    bytes = snapshot.bytes.len(),
                    "snapshot written"
                );
                break None;
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    generation = snapshot.generation,
                    attempt,
                    error = %e,
                    "snapshot write failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => {
                error!(
                    generation = snapshot.generation,
                    attempts = attempt,
                    error = %e,
                    "snapshot write failed, in-memory store remains authoritative"
                );
                break Some(PersistenceError::WriteFailed {
                    generation: snapshot.generation,
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        }
    };

    flushed.send_replace(FlushState {
        generation: snapshot.generation,
        error,
    });
}

/// Replace `path` with `bytes` through a sibling temporary file.
async fn write_replace(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = temp_path(path);
    let result = write_then_rename(&tmp, path, bytes).await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

async fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp, path).await
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("snapshot"));
    name.push(".tmp");
    path.with_file_name(name)
}
