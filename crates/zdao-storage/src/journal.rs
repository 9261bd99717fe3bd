//! Journal - Append-only log of sequenced entries, one JSON document per line.

use crate::StorageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A journal line: the entry plus its position in the global order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequenced<E> {
    pub seq: u64,
    pub entry: E,
}

/// Append-only journal file.
pub struct Journal {
    path: PathBuf,
    file: File,
}

impl Journal {
    pub const FILE_NAME: &'static str = "journal.log";

    /// Open (or create) the journal inside `dir`.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        let path = dir.join(Self::FILE_NAME);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Append one entry and flush it to disk before returning.
    pub fn append<E: Serialize>(&mut self, record: &Sequenced<E>) -> Result<(), StorageError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Read every entry in the journal.
    ///
    /// A final line without its newline is a torn write from an interrupted
    /// append; it is dropped and the file is cut back to the last full line.
    pub fn read_all<E: DeserializeOwned>(&mut self) -> Result<Vec<Sequenced<E>>, StorageError> {
        let content = fs::read_to_string(&self.path)?;
        let complete = match content.rfind('\n') {
            Some(idx) => idx + 1,
            None => 0,
        };

        if complete < content.len() {
            tracing::warn!(
                "Discarding torn journal tail ({} bytes) in {}",
                content.len() - complete,
                self.path.display()
            );
            self.file.set_len(complete as u64)?;
            self.file.sync_data()?;
        }

        let mut records = Vec::new();
        for (idx, line) in content[..complete].lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: Sequenced<E> = serde_json::from_str(line).map_err(|e| {
                StorageError::CorruptedJournal { line: idx + 1, reason: e.to_string() }
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Drop every entry. Called once a snapshot covers them.
    pub fn truncate(&mut self) -> Result<(), StorageError> {
        self.file.set_len(0)?;
        self.file.sync_data()?;
        Ok(())
    }
}
