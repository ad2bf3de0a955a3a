//! Read-only subcommands over a project's stored history.

use std::io::Write;

use anyhow::Context;
use scribe_core::{db, history, FileSet, Project, Turn};
use tokio_rusqlite::Connection;

async fn require_project(conn: &Connection, name: &str) -> anyhow::Result<Project> {
    db::find_project(conn, name)
        .await?
        .with_context(|| format!("no project named {:?}", name))
}

/// `scribe files`: one line per committed file.
pub async fn files(conn: &Connection, name: &str, out: &mut impl Write) -> anyhow::Result<()> {
    let project = require_project(conn, name).await?;
    let files = db::get_current_files(conn, &project.id).await?;
    for file in files.iter() {
        writeln!(out, "{}\t{}\t{}", file.name, file.language, file.content.lines().count())?;
    }
    Ok(())
}

/// `scribe history`: the project's turns, newest first.
pub async fn history(conn: &Connection, name: &str, out: &mut impl Write) -> anyhow::Result<()> {
    let project = require_project(conn, name).await?;
    let turns = db::list_turns(conn, &project.id).await?;
    for (index, turn) in turns.iter().enumerate() {
        writeln!(out, "{}", describe_turn(index + 1, turn))?;
    }
    Ok(())
}

fn describe_turn(k: usize, turn: &Turn) -> String {
    match &turn.diff {
        // The stored diff undoes the turn, so its deletions are the turn's creations.
        Ok(diff) => format!(
            "{}\t{}\t{}\t{} created, {} modified, {} removed",
            k,
            turn.id,
            turn.created_at,
            diff.deleted.len(),
            diff.modified.len(),
            diff.added.len()
        ),
        Err(error) => format!("{}\t{}\t{}\tunreadable: {}", k, turn.id, turn.created_at, error),
    }
}

/// `scribe checkout`: the state before the k-th most recent turn, as `<ns-file>` blocks.
pub async fn checkout(
    conn: &Connection,
    name: &str,
    before: usize,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let project = require_project(conn, name).await?;
    let current = db::get_current_files(conn, &project.id).await?;
    let turns = db::list_turns(conn, &project.id).await?;

    let state = history::state_before(&current, &turns, before).with_context(|| {
        format!("project {:?} has {} turns, cannot rewind past turn {}", name, turns.len(), before)
    })?;
    if let Some(error) = &state.error {
        tracing::warn!(turn = %state.turn_id, %error, "turn did not rewind, output is the last good state");
    }
    out.write_all(render_files(&state.files).as_bytes())?;
    Ok(())
}

/// Renders `files` in the tag protocol, so the output can be ingested again.
pub fn render_files(files: &FileSet) -> String {
    let mut text = String::new();
    for file in files.iter() {
        if file.content.contains("</ns-file>") {
            tracing::warn!(file = %file.name, "content contains a closing file tag and will not round-trip");
        }
        let quote = if file.name.contains('"') { '\'' } else { '"' };
        text.push_str(&format!(
            "<ns-file name={quote}{}{quote}>\n{}</ns-file>\n",
            file.name, file.content
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::{calculate_reverse_diff, File, StreamState};

    fn temp_db_path() -> std::path::PathBuf {
        let dir = tempfile::TempDir::new().unwrap();
        dir.keep().join("test.db")
    }

    #[test]
    fn rendered_files_ingest_back_to_the_same_set() {
        let files: FileSet = [
            File::new("src/lib.rs", "pub fn f() {}\n"),
            File::new("empty.txt", ""),
            File::new("lead.txt", "\nstarts with a blank line"),
            File::new("say \"hi\".md", "quoted name"),
        ]
        .into_iter()
        .collect();

        let mut state = StreamState::default();
        state.push(&render_files(&files));
        let state = state.finalize();
        assert_eq!(state.working_files, files);
    }

    #[tokio::test]
    async fn checkout_prints_earlier_state() {
        let conn = db::open_db(temp_db_path()).await.unwrap();
        let project = db::detect_or_create_project(&conn, "demo").await.unwrap();

        let v1: FileSet = [File::new("a.txt", "one")].into_iter().collect();
        let v2: FileSet = [File::new("a.txt", "two")].into_iter().collect();
        let d1 = calculate_reverse_diff(&FileSet::new(), &v1);
        db::commit_turn(&conn, &project.id, &v1, &d1, None).await.unwrap();
        let d2 = calculate_reverse_diff(&v1, &v2);
        db::commit_turn(&conn, &project.id, &v2, &d2, None).await.unwrap();

        let mut out = Vec::new();
        checkout(&conn, "demo", 1, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<ns-file name=\"a.txt\">\none</ns-file>\n");

        let mut out = Vec::new();
        checkout(&conn, "demo", 2, &mut out).await.unwrap();
        assert!(out.is_empty());

        let mut out = Vec::new();
        assert!(checkout(&conn, "demo", 3, &mut out).await.is_err());
        assert!(checkout(&conn, "missing", 1, &mut out).await.is_err());

        let mut out = Vec::new();
        history(&conn, "demo", &mut out).await.unwrap();
        let listing = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1\t") && lines[0].ends_with("0 created, 1 modified, 0 removed"));
        assert!(lines[1].ends_with("1 created, 0 modified, 0 removed"));

        let mut out = Vec::new();
        files(&conn, "demo", &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a.txt\tplaintext\t1\n");
    }
}
