//! Error types for the reverse-diff engine and the turn store.
//!
//! Parsing and patching never produce errors: malformed model output degrades
//! to status fields and log lines instead. These types cover the places where
//! a caller genuinely needs to know something went wrong.

/// A reverse diff could not be applied cleanly, or could not be read back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// A `modified` entry names a file that is not in the current set.
    #[error("reverse diff modifies {name}, which is not in the file set")]
    MissingTarget { name: String },

    /// Some hunks of a file's reverse diff found no matching context.
    #[error("{skipped} hunk(s) of the reverse diff for {name} did not apply")]
    HunksSkipped { name: String, skipped: usize },

    /// The stored JSON payload of a turn could not be decoded.
    #[error("stored reverse diff could not be decoded: {0}")]
    Decode(String),
}

/// Errors surfaced by the SQLite turn store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] tokio_rusqlite::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode reverse diff: {0}")]
    Encode(#[from] serde_json::Error),
}
