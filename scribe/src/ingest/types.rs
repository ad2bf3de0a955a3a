//! Owned data types for the parser thread.
//!
//! Everything here is fully owned and `Send`, so it can cross from the
//! thread that owns the `StreamState` to the async driver.

use std::collections::BTreeMap;

use scribe_core::{Annotation, FileStatus, Plan, StreamState};

/// Commands sent from the driver to the parser thread.
///
/// Sent over a `crossbeam_channel::Sender<ParseRequest>` owned by the driver.
#[derive(Debug)]
pub enum ParseRequest {
    /// The next piece of transcript text.
    Chunk(String),
    /// End of input, or cancellation. The worker finalizes and exits.
    Finish,
}

/// What the parser thread knows after consuming a chunk.
///
/// Carried inside `IngestEvent::Progress(Box<ProgressSnapshot>)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSnapshot {
    /// Total bytes handed to the tokenizer so far.
    pub bytes: usize,
    pub plan: Option<Plan>,
    pub file_statuses: BTreeMap<String, FileStatus>,
    /// Target of the file or patch currently streaming.
    pub current_file: Option<String>,
    /// Annotations that arrived since the previous snapshot.
    pub new_annotations: Vec<Annotation>,
}

impl ProgressSnapshot {
    /// Captures `state`, reporting annotations from index `seen` onwards.
    pub fn capture(state: &StreamState, bytes: usize, seen: usize) -> Self {
        Self {
            bytes,
            plan: state.plan.clone(),
            file_statuses: state.file_statuses.clone(),
            current_file: state.current_file_name().map(str::to_owned),
            new_annotations: state.annotations.get(seen..).unwrap_or_default().to_vec(),
        }
    }
}
