use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::error::{SnapshotError, StoreError};
use crate::types::{File, FileSet, Project, SnapshotDiff, Turn};

/// Opens (or creates) the SQLite database at `path`, configures WAL mode,
/// and applies schema migrations via the `schema_version` table.
///
/// This function is the single entry point for all database connections.
/// It sets `busy_timeout` via the `Connection` method (not a PRAGMA string) to
/// ensure the setting takes effect regardless of pragma caching.
///
/// # Errors
///
/// Returns `StoreError` if the file cannot be opened, WAL configuration
/// fails, or schema DDL fails.
pub async fn open_db(path: impl AsRef<Path>) -> Result<Connection, StoreError> {
    let conn = Connection::open(path.as_ref()).await?;

    conn.call(|db| -> rusqlite::Result<()> {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        // Fold any WAL left behind by an interrupted ingest back into the main file.
        db.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        crate::schema::migrate(db)
    })
    .await?;

    Ok(conn)
}

/// Returns the current Unix timestamp in seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Finds the project called `name`, or creates it.
///
/// On resume: updates `updated_at` to the current time via `BEGIN IMMEDIATE`.
/// On create: generates a new UUID v4 and inserts the project.
///
/// # Errors
///
/// Returns `StoreError` if the query or write transaction fails.
pub async fn detect_or_create_project(
    conn: &Connection,
    name: &str,
) -> Result<Project, StoreError> {
    let name = name.to_owned();

    let project = conn
        .call(move |db| -> rusqlite::Result<Project> {
            let existing: Option<Project> = db
                .query_row(
                    "SELECT id, name, created_at, updated_at FROM projects WHERE name = ?1",
                    rusqlite::params![&name],
                    project_from_row,
                )
                .optional()?;

            let now = now_secs();
            let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            let project = match existing {
                Some(mut project) => {
                    tx.execute(
                        "UPDATE projects SET updated_at = ?1 WHERE id = ?2",
                        rusqlite::params![now, &project.id],
                    )?;
                    project.updated_at = now;
                    project
                }
                None => {
                    let id = uuid::Uuid::new_v4().to_string();
                    tx.execute(
                        "INSERT INTO projects (id, name, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?3)",
                        rusqlite::params![&id, &name, now],
                    )?;
                    Project { id, name, created_at: now, updated_at: now }
                }
            };
            tx.commit()?;
            Ok(project)
        })
        .await?;

    Ok(project)
}

/// Looks up the project called `name` without creating or touching it.
///
/// # Errors
///
/// Returns `StoreError` if the query fails.
pub async fn find_project(conn: &Connection, name: &str) -> Result<Option<Project>, StoreError> {
    let name = name.to_owned();

    let project = conn
        .call(move |db| -> rusqlite::Result<Option<Project>> {
            db.query_row(
                "SELECT id, name, created_at, updated_at FROM projects WHERE name = ?1",
                rusqlite::params![&name],
                project_from_row,
            )
            .optional()
        })
        .await?;

    Ok(project)
}

fn project_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: r.get(0)?,
        name: r.get(1)?,
        created_at: r.get(2)?,
        updated_at: r.get(3)?,
    })
}

/// Loads the committed file set of `project_id`, in stored order.
///
/// # Errors
///
/// Returns `StoreError` if the query fails.
pub async fn get_current_files(
    conn: &Connection,
    project_id: &str,
) -> Result<FileSet, StoreError> {
    let project_id = project_id.to_owned();

    let files = conn
        .call(move |db| -> rusqlite::Result<FileSet> {
            let mut stmt = db.prepare(
                "SELECT name, content, language FROM files
                 WHERE project_id = ?1
                 ORDER BY position",
            )?;
            let files = stmt
                .query_map(rusqlite::params![&project_id], |r| {
                    Ok(File { name: r.get(0)?, content: r.get(1)?, language: r.get(2)? })
                })?
                .collect::<rusqlite::Result<FileSet>>()?;
            Ok(files)
        })
        .await?;

    Ok(files)
}

/// Appends one turn's reverse diff to the project's history.
///
/// The turn is numbered one past the current newest turn.
///
/// # Errors
///
/// Returns `StoreError` if the diff cannot be encoded or the insert fails.
pub async fn save_turn(
    conn: &Connection,
    project_id: &str,
    turn_id: &str,
    diff: &SnapshotDiff,
    summary: Option<&str>,
) -> Result<(), StoreError> {
    let project_id = project_id.to_owned();
    let turn_id = turn_id.to_owned();
    let payload = serde_json::to_string(diff)?;
    let summary = summary.map(str::to_owned);

    conn.call(move |db| -> rusqlite::Result<()> {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        insert_turn(&tx, &project_id, &turn_id, &payload, summary.as_deref())?;
        tx.commit()
    })
    .await?;

    Ok(())
}

/// Lists the project's turns, newest first.
///
/// A stored payload that no longer decodes is returned as a turn whose `diff`
/// is an error, so a history walk can step over it.
///
/// # Errors
///
/// Returns `StoreError` if the query fails.
pub async fn list_turns(conn: &Connection, project_id: &str) -> Result<Vec<Turn>, StoreError> {
    let project_id = project_id.to_owned();

    let rows = conn
        .call(move |db| -> rusqlite::Result<Vec<(String, String, i64)>> {
            let mut stmt = db.prepare(
                "SELECT id, diff, created_at FROM turns
                 WHERE project_id = ?1
                 ORDER BY seq DESC",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![&project_id], |r| {
                    Ok((r.get(0)?, r.get(1)?, r.get(2)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await?;

    Ok(rows
        .into_iter()
        .map(|(id, payload, created_at)| Turn {
            id,
            created_at,
            diff: serde_json::from_str::<SnapshotDiff>(&payload)
                .map_err(|e| SnapshotError::Decode(e.to_string())),
        })
        .collect())
}

/// Replaces the project's committed files and records the turn's reverse diff.
///
/// Both writes happen in one `BEGIN IMMEDIATE` transaction, so the stored
/// history always matches the stored files. Returns the new turn ID.
///
/// # Errors
///
/// Returns `StoreError` if the diff cannot be encoded or the transaction fails.
pub async fn commit_turn(
    conn: &Connection,
    project_id: &str,
    files: &FileSet,
    diff: &SnapshotDiff,
    summary: Option<&str>,
) -> Result<String, StoreError> {
    let project_id = project_id.to_owned();
    let files: Vec<File> = files.clone().into();
    let payload = serde_json::to_string(diff)?;
    let summary = summary.map(str::to_owned);
    let turn_id = uuid::Uuid::new_v4().to_string();
    let id = turn_id.clone();

    conn.call(move |db| -> rusqlite::Result<()> {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM files WHERE project_id = ?1", rusqlite::params![&project_id])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO files (project_id, name, content, language, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, file) in files.iter().enumerate() {
                insert.execute(rusqlite::params![
                    &project_id,
                    &file.name,
                    &file.content,
                    &file.language,
                    position as i64
                ])?;
            }
        }
        insert_turn(&tx, &project_id, &id, &payload, summary.as_deref())?;
        tx.execute(
            "UPDATE projects SET updated_at = ?1 WHERE id = ?2",
            rusqlite::params![now_secs(), &project_id],
        )?;
        tx.commit()
    })
    .await?;

    Ok(turn_id)
}

fn insert_turn(
    tx: &rusqlite::Transaction<'_>,
    project_id: &str,
    turn_id: &str,
    payload: &str,
    summary: Option<&str>,
) -> rusqlite::Result<()> {
    let seq: i64 = tx.query_row(
        "SELECT COALESCE(MAX(seq), 0) + 1 FROM turns WHERE project_id = ?1",
        rusqlite::params![project_id],
        |r| r.get(0),
    )?;
    tx.execute(
        "INSERT INTO turns (id, project_id, seq, diff, summary, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![turn_id, project_id, seq, payload, summary, now_secs()],
    )?;
    Ok(())
}
