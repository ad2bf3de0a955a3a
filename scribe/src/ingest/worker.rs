//! Background thread that owns the `StreamState` for one turn.
//!
//! All communication is via channels: `ParseRequest` in, `IngestEvent` out.
//! The state never leaves this thread until it has been finalized.

use crossbeam_channel::Receiver;
use scribe_core::{FileSet, StreamState};
use tokio::sync::mpsc::UnboundedSender;

use crate::event::IngestEvent;
use crate::ingest::types::{ParseRequest, ProgressSnapshot};

/// Entry point for the parser thread.
///
/// Seeds the working set with `committed` and feeds every received chunk to
/// the tokenizer until `Finish` arrives or the request channel closes. Either
/// way the finalized state is sent as `IngestEvent::Finished`.
pub fn parser_worker_loop(
    committed: FileSet,
    rx: Receiver<ParseRequest>,
    event_tx: UnboundedSender<IngestEvent>,
) {
    let mut state = StreamState::new(committed);
    let mut bytes = 0;
    let mut seen_annotations = 0;

    for request in rx {
        match request {
            ParseRequest::Chunk(chunk) => {
                bytes += chunk.len();
                state.push(&chunk);
                let snapshot = ProgressSnapshot::capture(&state, bytes, seen_annotations);
                seen_annotations = state.annotations.len();
                let _ = event_tx.send(IngestEvent::Progress(Box::new(snapshot)));
            }
            ParseRequest::Finish => break,
        }
    }

    tracing::debug!(bytes, pending = state.buffer().len(), "finalizing turn");
    let _ = event_tx.send(IngestEvent::Finished(Box::new(state.finalize())));
}
