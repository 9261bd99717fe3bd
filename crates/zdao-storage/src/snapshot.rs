//! Snapshot - Full-state image written atomically (tmp file + rename).

use crate::StorageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Snapshot contents: the state after applying every entry up to `seq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<S> {
    pub seq: u64,
    pub state: S,
}

/// Snapshot file inside a data directory.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub const FILE_NAME: &'static str = "snapshot.json";

    pub fn new(dir: &Path) -> Self {
        Self { path: dir.join(Self::FILE_NAME) }
    }

    /// Load the snapshot if one has been written.
    pub fn load<S: DeserializeOwned>(&self) -> Result<Option<Snapshot<S>>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let snapshot = serde_json::from_str(&content)
            .map_err(|e| StorageError::CorruptedSnapshot(e.to_string()))?;
        Ok(Some(snapshot))
    }

    /// Replace the snapshot. Readers see either the old or the new file, never a partial one.
    pub fn write<S: Serialize>(&self, snapshot: &Snapshot<S>) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(snapshot)?;
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&content)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        tracing::debug!("Snapshot at seq {} written to {}", snapshot.seq, self.path.display());
        Ok(())
    }
}
