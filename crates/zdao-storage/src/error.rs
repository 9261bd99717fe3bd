use thiserror::Error;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupted journal at line {line}: {reason}")]
    CorruptedJournal { line: usize, reason: String },

    #[error("Corrupted snapshot: {0}")]
    CorruptedSnapshot(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}
