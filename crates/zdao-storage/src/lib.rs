//! ZDAO Storage - Durable state as an append-only journal plus periodic snapshots.
//!
//! Every committed operation is appended to `journal.log` as one JSON line.
//! Every `snapshot_interval` entries the caller hands over a full state image,
//! which is written to `snapshot.json` and the journal is truncated. On open
//! the latest snapshot and the journal entries that follow it are returned so
//! the owner can rebuild its in-memory state by replay.

pub mod error;
pub mod journal;
pub mod snapshot;

pub use error::StorageError;
pub use journal::{Journal, Sequenced};
pub use snapshot::{Snapshot, SnapshotFile};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Number of journal entries between snapshots (0 disables snapshots)
    pub snapshot_interval: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { snapshot_interval: 256 }
    }
}

/// State recovered from disk on open.
#[derive(Debug)]
pub struct Recovered<S, E> {
    /// Latest snapshot, if any
    pub snapshot: Option<S>,
    /// Entries committed after the snapshot, in order
    pub entries: Vec<E>,
}

struct StoreInner {
    journal: Journal,
    snapshots: SnapshotFile,
    next_seq: u64,
    since_snapshot: u64,
}

/// Journal + snapshot store for one state type `S` and one entry type `E`.
pub struct Store<S, E> {
    path: PathBuf,
    config: StorageConfig,
    inner: Mutex<StoreInner>,
    _marker: PhantomData<fn() -> (S, E)>,
}

impl<S, E> Store<S, E>
where
    S: Serialize + DeserializeOwned,
    E: Serialize + DeserializeOwned,
{
    /// Open the store in `path`, creating the directory if needed.
    pub fn open(path: &Path, config: StorageConfig) -> Result<(Self, Recovered<S, E>), StorageError> {
        let path_str = path.to_string_lossy();
        if path_str.contains("..") {
            return Err(StorageError::InvalidPath(path_str.to_string()));
        }
        fs::create_dir_all(path)?;

        let snapshots = SnapshotFile::new(path);
        let mut journal = Journal::open(path)?;

        let snapshot: Option<Snapshot<S>> = snapshots.load()?;
        let snapshot_seq = snapshot.as_ref().map(|s| s.seq).unwrap_or(0);

        // Entries at or below the snapshot sequence were folded into it already;
        // they survive only if the process stopped between snapshot and truncate.
        let records: Vec<Sequenced<E>> = journal.read_all()?;
        let last_seq = records.last().map(|r| r.seq).unwrap_or(0).max(snapshot_seq);
        let entries: Vec<E> = records
            .into_iter()
            .filter(|r| r.seq > snapshot_seq)
            .map(|r| r.entry)
            .collect();

        tracing::info!(
            "Opened store at {}: snapshot seq {}, {} journal entries to replay",
            path.display(),
            snapshot_seq,
            entries.len()
        );

        let since_snapshot = entries.len() as u64;
        let store = Self {
            path: path.to_path_buf(),
            config,
            inner: Mutex::new(StoreInner {
                journal,
                snapshots,
                next_seq: last_seq + 1,
                since_snapshot,
            }),
            _marker: PhantomData,
        };

        Ok((
            store,
            Recovered {
                snapshot: snapshot.map(|s| s.state),
                entries,
            },
        ))
    }

    /// Append an entry. Returns true when a snapshot is due.
    pub fn append(&self, entry: &E) -> Result<bool, StorageError> {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.journal.append(&Sequenced { seq, entry })?;
        inner.next_seq += 1;
        inner.since_snapshot += 1;

        let interval = self.config.snapshot_interval;
        Ok(interval > 0 && inner.since_snapshot >= interval)
    }

    /// Write a snapshot covering every entry appended so far, then drop the journal.
    pub fn snapshot(&self, state: &S) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq - 1;
        inner.snapshots.write(&Snapshot { seq, state })?;
        inner.journal.truncate()?;
        inner.since_snapshot = 0;
        tracing::info!("Snapshot written at seq {}", seq);
        Ok(())
    }

    /// Sequence number of the last appended entry.
    pub fn last_seq(&self) -> u64 {
        self.inner.lock().next_seq - 1
    }

    /// Data directory of this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}
