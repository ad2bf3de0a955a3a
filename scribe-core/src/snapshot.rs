//! Reverse diffs between two file sets.
//!
//! A turn is stored as the instructions that undo it, not as a full snapshot.
//! Modified files carry hunk text in the same format the patch applier reads,
//! oriented so that applying it to the *new* content yields the *old* content.

use similar::{Algorithm, ChangeTag, TextDiff};

use crate::error::SnapshotError;
use crate::patch;
use crate::types::{FileSet, SnapshotDiff};

/// Lines of unchanged context around each generated hunk.
const CONTEXT_LINES: usize = 3;

/// Computes the diff that turns `new` back into `old`.
pub fn calculate_reverse_diff(old: &FileSet, new: &FileSet) -> SnapshotDiff {
    let mut diff = SnapshotDiff::default();

    for file in old.iter() {
        match new.get(&file.name) {
            None => diff.added.push(file.clone()),
            Some(current) if current.content != file.content => {
                diff.modified
                    .insert(file.name.clone(), reverse_patch(&current.content, &file.content));
            }
            Some(_) => {}
        }
    }
    diff.deleted = new
        .names()
        .filter(|name| !old.contains(name))
        .map(str::to_owned)
        .collect();

    diff
}

/// Produces hunk text that transforms `new` into `old`.
///
/// The output is verified against the patch applier. If the context-anchored
/// hunks would land somewhere else (a repeated block earlier in the file), a
/// single whole-file hunk is emitted instead, which always reproduces `old`.
pub fn reverse_patch(new: &str, old: &str) -> String {
    let from: Vec<&str> = new.split('\n').collect();
    let to: Vec<&str> = old.split('\n').collect();
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_slices(&from, &to);

    let mut text = String::new();
    for group in diff.grouped_ops(CONTEXT_LINES) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_start = first.old_range().start;
        let new_start = first.new_range().start;
        text.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start + 1,
            last.old_range().end - old_start,
            new_start + 1,
            last.new_range().end - new_start,
        ));
        for op in &group {
            for change in diff.iter_changes(op) {
                text.push(match change.tag() {
                    ChangeTag::Equal => ' ',
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                });
                text.push_str(change.value());
                text.push('\n');
            }
        }
    }

    if patch::apply_diff_quiet(new, &text).text == old {
        return text;
    }
    tracing::debug!("context hunks are ambiguous, falling back to a whole-file hunk");
    whole_file_patch(new, old)
}

fn whole_file_patch(new: &str, old: &str) -> String {
    let mut text = String::from("@@ @@\n");
    for line in new.split('\n') {
        text.push('-');
        text.push_str(line);
        text.push('\n');
    }
    for line in old.split('\n') {
        text.push('+');
        text.push_str(line);
        text.push('\n');
    }
    text
}

/// Applies a reverse diff, recovering the file set as it was before the turn.
///
/// Lenient: a missing modify target or an unmatched hunk is logged and the
/// best-effort result is returned.
pub fn apply_reverse_snapshot_diff(current: &FileSet, diff: &SnapshotDiff) -> FileSet {
    let (files, problems) = rewind(current, diff);
    for problem in &problems {
        tracing::warn!(%problem, "reverse diff did not apply cleanly");
    }
    files
}

/// Applies a reverse diff, failing on the first file that does not apply cleanly.
pub fn try_apply_reverse_snapshot_diff(
    current: &FileSet,
    diff: &SnapshotDiff,
) -> Result<FileSet, SnapshotError> {
    let (files, problems) = rewind(current, diff);
    match problems.into_iter().next() {
        Some(problem) => Err(problem),
        None => Ok(files),
    }
}

fn rewind(current: &FileSet, diff: &SnapshotDiff) -> (FileSet, Vec<SnapshotError>) {
    let mut files = current.clone();
    let mut problems = Vec::new();

    for name in &diff.deleted {
        files.remove(name);
    }
    for file in &diff.added {
        if files.contains(&file.name) {
            tracing::debug!(file = %file.name, "file to restore already exists, keeping it");
            continue;
        }
        files.upsert(file.clone());
    }
    for (name, hunks) in &diff.modified {
        let Some(file) = files.get(name) else {
            problems.push(SnapshotError::MissingTarget { name: name.clone() });
            continue;
        };
        let report = patch::apply_diff_report(&file.content, hunks);
        if !report.skipped.is_empty() {
            problems.push(SnapshotError::HunksSkipped {
                name: name.clone(),
                skipped: report.skipped.len(),
            });
        }
        let mut restored = file.clone();
        restored.content = report.text;
        files.upsert(restored);
    }

    (files, problems)
}
