//! Core of scribe: turns a model's tagged output stream into file mutations
//! and keeps an undo history of them.
//!
//! - [`stream`] consumes arbitrarily fragmented chunks of the `<ns-…>` tag
//!   protocol and maintains the working file set for one turn.
//! - [`patch`] applies diff hunks by context rather than line numbers.
//! - [`snapshot`] computes and applies per-turn reverse diffs.
//! - [`history`] walks reverse diffs to recover any earlier project state.
//! - [`db`] persists committed files and turns in SQLite.

pub mod db;
pub mod error;
pub mod history;
pub mod patch;
pub mod schema;
pub mod snapshot;
pub mod stream;
pub mod types;

pub use error::{SnapshotError, StoreError};
pub use history::{reconstruct, state_before, Reconstruction, Rewind};
pub use patch::{apply_diff, apply_diff_report, PatchReport};
pub use snapshot::{
    apply_reverse_snapshot_diff, calculate_reverse_diff, try_apply_reverse_snapshot_diff,
};
pub use stream::{finalize, process_chunk, Mode, StreamState};
pub use types::{
    Annotation, File, FileSet, FileStatus, Plan, Project, Severity, SnapshotDiff, Turn,
};
