//! Event bus between the parser thread and the ingest driver.
//!
//! The worker normalises everything it has to say into a single
//! `IngestEvent` and sends it over a tokio unbounded MPSC channel. The
//! driver receives from this channel inside its `select!` loop.

use scribe_core::StreamState;
use tokio::sync::mpsc;

use crate::ingest::types::ProgressSnapshot;

/// All events the driver can receive from the parser thread.
#[derive(Debug)]
pub enum IngestEvent {
    /// Sent after every consumed chunk.
    Progress(Box<ProgressSnapshot>),
    /// The finalized state. Always the last event the worker sends.
    Finished(Box<StreamState>),
}

/// Holds the sender and receiver ends of the event channel.
///
/// The sender (`tx`) is moved into the parser thread; the receiver (`rx`)
/// is owned by the driver loop.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<IngestEvent>,
    pub rx: mpsc::UnboundedReceiver<IngestEvent>,
}

impl EventHandler {
    /// Creates a new `EventHandler` with a fresh unbounded channel.
    ///
    /// The worker produces at most one event per input chunk, and input is
    /// only read as fast as the driver loop turns, so the queue stays short.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
