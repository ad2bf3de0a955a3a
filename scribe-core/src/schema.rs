/// DDL to create the schema_version tracking table.
///
/// Applied unconditionally on every DB open (before checking the version),
/// using `IF NOT EXISTS` so it is safe to run multiple times.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the full v1 schema.
///
/// Contains three tables:
/// - `projects`: one row per project, keyed by UUID v4 text, unique by name.
/// - `files`: the committed file set of each project; `position` keeps order.
/// - `turns`: one reverse diff per committed turn, JSON-encoded, ordered by `seq`.
///
/// All tables use `STRICT` mode for type enforcement.
/// Foreign keys use `ON DELETE CASCADE` so removing a project cleans up all child rows.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS projects (
        id          TEXT    PRIMARY KEY,
        name        TEXT    NOT NULL UNIQUE,
        created_at  INTEGER NOT NULL,
        updated_at  INTEGER NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS files (
        project_id  TEXT    NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        name        TEXT    NOT NULL,
        content     TEXT    NOT NULL,
        language    TEXT    NOT NULL,
        position    INTEGER NOT NULL,
        PRIMARY KEY (project_id, name)
    ) STRICT;

    CREATE TABLE IF NOT EXISTS turns (
        id          TEXT    PRIMARY KEY,
        project_id  TEXT    NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        seq         INTEGER NOT NULL,
        diff        TEXT    NOT NULL,
        summary     TEXT,
        created_at  INTEGER NOT NULL,
        UNIQUE (project_id, seq)
    ) STRICT;
";

/// Forward-only migrations, in version order.
///
/// A database at version `n` has had every step with `version <= n` applied.
const MIGRATIONS: &[(i64, &str)] = &[(1, SCHEMA_V1_SQL)];

/// Latest schema version this build knows how to create.
pub const SCHEMA_VERSION: i64 = 1;

/// Brings the database up to [`SCHEMA_VERSION`].
///
/// Idempotent: each pending step runs in its own `BEGIN IMMEDIATE`
/// transaction together with its `schema_version` row, so an interrupted
/// open resumes where it stopped.
///
/// # Errors
///
/// Returns `rusqlite::Error` if the DDL fails or the version row cannot be read.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let current: i64 = db.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(sql)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        tx.commit()?;
        tracing::debug!(version, "applied schema migration");
    }

    Ok(())
}
