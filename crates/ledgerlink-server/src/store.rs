//! Credential store mapping usernames to provider access tokens.
//!
//! The store keeps an append-only sequence of [`UserRecord`]s in memory and
//! mirrors it to a JSON snapshot file through a [`SnapshotWriter`]. Lookups
//! resolve to the first record for a username.
//!
//! Every mutation serializes the full sequence and hands it to the writer
//! while still holding the write lock, so snapshot generations follow
//! mutation order and the newest write always reflects the newest state.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ledgerlink_models::{AccessToken, UserRecord, Username};
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};

use crate::persistence::{PersistenceError, Snapshot, SnapshotWriter, WriterConfig};

/// Startup failures of the token store. Fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The snapshot file could not be opened or created.
    #[error("failed to open token store {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file was opened but could not be read.
    #[error("failed to read token store {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of [`TokenStore::add_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// A new record was appended.
    Inserted,
    /// The username already had a record; nothing was changed.
    Existing(UserRecord),
}

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<UserRecord>,
    /// Generation of the last snapshot handed to the writer.
    generation: u64,
}

struct Inner {
    state: RwLock<StoreState>,
    writer: SnapshotWriter,
}

/// Shared handle to the credential store. Cloning is cheap.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

impl TokenStore {
    /// Open the store backed by `path`, creating the file if needed.
    ///
    /// An empty or malformed file yields an empty store. Failing to open or
    /// read the file is an error the caller should treat as fatal.
    pub async fn open(path: impl Into<PathBuf>, config: WriterConfig) -> Result<Self, StoreError> {
        let path = path.into();
        let bytes = read_or_create(&path).await?;

        let store = Self {
            inner: Arc::new(Inner {
                state: RwLock::new(StoreState::default()),
                writer: SnapshotWriter::spawn(path.clone(), config, 0),
            }),
        };
        store.load_from_snapshot(&bytes);

        info!(
            path = %path.display(),
            records = store.len(),
            "token store loaded"
        );
        Ok(store)
    }

    /// Replace the in-memory records with the contents of a snapshot.
    ///
    /// Empty input yields an empty store; malformed input is logged and
    /// also yields an empty store. Nothing is written back.
    pub fn load_from_snapshot(&self, bytes: &[u8]) {
        let records = decode_snapshot(bytes);
        self.write_state().records = records;
    }

    /// Return the first record for `username`, if any.
    pub fn lookup(&self, username: &Username) -> Option<UserRecord> {
        self.read_state()
            .records
            .iter()
            .find(|record| record.username == *username)
            .cloned()
    }

    /// Append a record and schedule a snapshot write.
    ///
    /// Does not check for an existing record: a duplicate is appended and
    /// shadowed by the earlier one on lookup.
    pub fn add(&self, username: Username, access_token: AccessToken) {
        let mut state = self.write_state();
        state
            .records
            .push(UserRecord::new(username, access_token));
        self.publish(&mut state);
    }

    /// Append a record unless `username` already has one.
    ///
    /// The check and the append happen under one write lock, so concurrent
    /// callers for the same username produce exactly one record.
    pub fn add_if_absent(&self, username: Username, access_token: AccessToken) -> Insertion {
        let mut state = self.write_state();
        if let Some(existing) = state.records.iter().find(|r| r.username == username) {
            return Insertion::Existing(existing.clone());
        }
        state
            .records
            .push(UserRecord::new(username, access_token));
        self.publish(&mut state);
        Insertion::Inserted
    }

    /// Copy of all records in insertion order.
    pub fn records(&self) -> Vec<UserRecord> {
        self.read_state().records.clone()
    }

    /// Number of records, duplicates included.
    pub fn len(&self) -> usize {
        self.read_state().records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.read_state().records.is_empty()
    }

    /// Snapshot file backing this store.
    pub fn path(&self) -> &Path {
        self.inner.writer.path()
    }

    /// Wait until the state as of this call has been written.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let generation = self.read_state().generation;
        self.inner.writer.flush(generation).await
    }

    /// Write any pending snapshot and stop the writer.
    pub async fn shutdown(&self) {
        self.inner.writer.shutdown().await;
    }

    /// Serialize the current records and hand them to the writer.
    /// Must be called with the write lock held.
    fn publish(&self, state: &mut StoreState) {
        match serde_json::to_vec(&state.records) {
            Ok(bytes) => {
                state.generation += 1;
                self.inner
                    .writer
                    .submit(Snapshot::new(state.generation, bytes));
            }
            Err(e) => error!(error = %e, "failed to serialize token store snapshot"),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn decode_snapshot(bytes: &[u8]) -> Vec<UserRecord> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Vec::new();
    }
    match serde_json::from_slice::<Vec<UserRecord>>(bytes) {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "malformed token store snapshot, starting empty");
            Vec::new()
        }
    }
}

async fn read_or_create(path: &Path) -> Result<Vec<u8>, StoreError> {
    let mut file = tokio::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await
        .map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .await
        .map_err(|source| StoreError::Read {
            path: path.display().to_string(),
            source,
        })?;
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
