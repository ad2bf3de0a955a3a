//! Human-readable output for an ingest run.
//!
//! Progress goes to stderr while the transcript streams; the turn summary
//! goes to stdout once the turn is committed (or not).

use std::collections::BTreeMap;
use std::io::{self, Write};

use scribe_core::{Annotation, FileStatus, Plan, Severity, SnapshotDiff, StreamState};

use crate::ingest::types::ProgressSnapshot;

/// What happened to the finalized turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Committed { turn_id: String },
    /// The turn changed no files.
    Unchanged,
    DryRun,
}

/// Prints only what changed between successive progress snapshots.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    plan: Option<Plan>,
    statuses: BTreeMap<String, FileStatus>,
}

impl ProgressReporter {
    pub fn update(&mut self, snapshot: &ProgressSnapshot, out: &mut impl Write) -> io::Result<()> {
        tracing::trace!(
            bytes = snapshot.bytes,
            current = snapshot.current_file.as_deref().unwrap_or("-"),
            "progress"
        );
        if snapshot.plan != self.plan {
            if let Some(plan) = &snapshot.plan {
                writeln!(out, "[{}/{}] {}", plan.current_step, plan.total_steps, plan.task)?;
            }
            self.plan = snapshot.plan.clone();
        }

        for (name, status) in &snapshot.file_statuses {
            if self.statuses.get(name) != Some(status) {
                writeln!(out, "  {:<8} {}", status_label(*status), name)?;
            }
        }
        self.statuses.clone_from(&snapshot.file_statuses);

        for annotation in &snapshot.new_annotations {
            write_annotation(out, annotation)?;
        }
        Ok(())
    }
}

fn status_label(status: FileStatus) -> &'static str {
    match status {
        FileStatus::Pending => "writing",
        FileStatus::Success => "done",
        FileStatus::Error => "failed",
    }
}

fn write_annotation(out: &mut impl Write, annotation: &Annotation) -> io::Result<()> {
    let severity = match annotation.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
    };
    writeln!(
        out,
        "  {}:{}: {}: {}",
        annotation.file, annotation.line, severity, annotation.message
    )?;
    if let Some(suggestion) = &annotation.suggestion {
        writeln!(out, "    suggestion: {}", suggestion)?;
    }
    Ok(())
}

/// Writes the end-of-turn summary.
///
/// `diff` is the turn's reverse diff, so its `deleted` names are the files
/// the turn created and its `added` files are the ones it removed.
pub fn write_summary(
    out: &mut impl Write,
    state: &StreamState,
    diff: &SnapshotDiff,
    outcome: &Outcome,
) -> io::Result<()> {
    writeln!(
        out,
        "files: {} created, {} modified, {} removed",
        diff.deleted.len(),
        diff.modified.len(),
        diff.added.len()
    )?;
    for name in &diff.deleted {
        writeln!(out, "  + {}", name)?;
    }
    for name in diff.modified.keys() {
        writeln!(out, "  ~ {}", name)?;
    }
    for file in &diff.added {
        writeln!(out, "  - {}", file.name)?;
    }
    for (name, _) in state.file_statuses.iter().filter(|(_, s)| **s == FileStatus::Error) {
        writeln!(out, "  ! {} (failed)", name)?;
    }

    if !state.dependencies.is_empty() {
        writeln!(out, "dependencies:")?;
        for (name, version) in &state.dependencies {
            writeln!(out, "  {}@{}", name, version)?;
        }
    }
    if !state.commands.is_empty() {
        writeln!(out, "commands:")?;
        for command in &state.commands {
            writeln!(out, "  $ {}", command)?;
        }
    }
    if !state.summary_text.is_empty() {
        writeln!(out, "\n{}\n", state.summary_text)?;
    }

    match outcome {
        Outcome::Committed { turn_id } => writeln!(out, "committed turn {}", turn_id),
        Outcome::Unchanged => writeln!(out, "no file changes, nothing committed"),
        Outcome::DryRun => writeln!(out, "dry run, nothing committed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::{calculate_reverse_diff, File, FileSet};

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn progress_prints_transitions_once() {
        let mut reporter = ProgressReporter::default();
        let mut snapshot = ProgressSnapshot {
            plan: Some(Plan { current_step: 1, total_steps: 2, task: "Scaffold".to_owned() }),
            file_statuses: [("a.ts".to_owned(), FileStatus::Pending)].into(),
            ..ProgressSnapshot::default()
        };

        let mut out = Vec::new();
        reporter.update(&snapshot, &mut out).unwrap();
        reporter.update(&snapshot, &mut out).unwrap();
        snapshot.file_statuses.insert("a.ts".to_owned(), FileStatus::Success);
        snapshot.new_annotations.push(Annotation {
            file: "a.ts".to_owned(),
            line: 4,
            severity: Severity::Warning,
            message: "unused import".to_owned(),
            suggestion: Some("drop it".to_owned()),
        });
        reporter.update(&snapshot, &mut out).unwrap();

        assert_eq!(
            text(out),
            "[1/2] Scaffold\n  writing  a.ts\n  done     a.ts\n  a.ts:4: warning: unused import\n    suggestion: drop it\n"
        );
    }

    #[test]
    fn summary_lists_changes_from_the_reverse_diff() {
        let before: FileSet = [File::new("old.rs", "x"), File::new("edit.rs", "1")].into_iter().collect();
        let mut state = StreamState::new(before.clone());
        state.push("<ns-file name=\"new.rs\">n</ns-file><ns-file name=\"edit.rs\">2</ns-file>");
        state.push("<ns-dependency name=\"serde\" version=\"1\" /><ns-command>cargo build</ns-command>");
        state.push("<ns-summary>Rewrote edit.rs.</ns-summary><ns-patch name=\"gone.rs\"></ns-patch>");
        let mut state = state.finalize();
        state.working_files.remove("old.rs");
        let diff = calculate_reverse_diff(&before, &state.working_files);

        let mut out = Vec::new();
        write_summary(&mut out, &state, &diff, &Outcome::Committed { turn_id: "t-1".to_owned() })
            .unwrap();
        let out = text(out);

        assert!(out.starts_with("files: 1 created, 1 modified, 1 removed\n"));
        assert!(out.contains("  + new.rs\n  ~ edit.rs\n  - old.rs\n  ! gone.rs (failed)\n"));
        assert!(out.contains("  serde@1\n"));
        assert!(out.contains("  $ cargo build\n"));
        assert!(out.contains("\nRewrote edit.rs.\n"));
        assert!(out.ends_with("committed turn t-1\n"));
    }
}
