//! Reconstruction of past project states from stored reverse diffs.
//!
//! Starting at the current committed files, each turn's reverse diff is applied
//! in newest-first order, so the k-th step yields the state just before the
//! k-th most recent turn. A turn that fails to apply does not end the walk: it
//! is reported and the next turn is applied to the last good state.

use crate::error::SnapshotError;
use crate::snapshot;
use crate::types::{FileSet, Turn};

/// The project state immediately before one turn.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub turn_id: String,
    /// Best-known files before the turn. When `error` is set this is the last
    /// state that was reconstructed cleanly.
    pub files: FileSet,
    pub error: Option<SnapshotError>,
}

/// Lazy newest-first walk over a project's history.
///
/// Borrows the stored turns; nothing is mutated.
pub struct Rewind<'a> {
    base: FileSet,
    turns: std::slice::Iter<'a, Turn>,
}

impl<'a> Rewind<'a> {
    /// `turns` must be ordered newest first.
    pub fn new(current: &FileSet, turns: &'a [Turn]) -> Self {
        Self { base: current.clone(), turns: turns.iter() }
    }
}

impl Iterator for Rewind<'_> {
    type Item = Reconstruction;

    fn next(&mut self) -> Option<Reconstruction> {
        let turn = self.turns.next()?;
        let step = turn
            .diff
            .as_ref()
            .map_err(Clone::clone)
            .and_then(|diff| snapshot::try_apply_reverse_snapshot_diff(&self.base, diff));

        let error = match step {
            Ok(files) => {
                self.base = files;
                None
            }
            Err(error) => {
                tracing::warn!(turn = %turn.id, %error, "skipping turn during history walk");
                Some(error)
            }
        };
        Some(Reconstruction { turn_id: turn.id.clone(), files: self.base.clone(), error })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.turns.size_hint()
    }
}

/// Reconstructs the state before every turn, newest first.
pub fn reconstruct(current: &FileSet, turns: &[Turn]) -> Vec<Reconstruction> {
    Rewind::new(current, turns).collect()
}

/// State before the k-th most recent turn (1-based). `None` if out of range.
pub fn state_before(current: &FileSet, turns: &[Turn], k: usize) -> Option<Reconstruction> {
    let index = k.checked_sub(1)?;
    Rewind::new(current, turns).nth(index)
}
