/// DDL to create the schema_version tracking table.
///
/// Applied unconditionally on every DB open (before checking the version),
/// using `IF NOT EXISTS` so it is safe to run multiple times.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the v1 schema.
///
/// - `sessions`: one row per review session, keyed by UUID v4 text.
/// - `comments`: a comment on an inclusive line range on one side of a file.
///
/// Both tables are `STRICT`; removing a session cascades to its comments.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS sessions (
        id          TEXT    PRIMARY KEY,
        repo_path   TEXT    NOT NULL,
        diff_mode   TEXT    NOT NULL,
        created_at  INTEGER NOT NULL,
        updated_at  INTEGER NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS comments (
        id          TEXT    PRIMARY KEY,
        session_id  TEXT    NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        file_path   TEXT    NOT NULL,
        side        TEXT    NOT NULL CHECK(side IN ('old', 'new')),
        start_line  INTEGER NOT NULL,
        end_line    INTEGER NOT NULL,
        body        TEXT    NOT NULL,
        created_at  INTEGER NOT NULL,
        CHECK(start_line <= end_line)
    ) STRICT;

    CREATE INDEX IF NOT EXISTS comments_by_file ON comments(session_id, file_path);
";

/// Runs forward-only schema migration to the latest version.
///
/// Idempotent: safe on every startup. Tables left behind by an unversioned
/// database are dropped before v1 is applied, since their shape is unknown.
///
/// # Errors
///
/// Returns `rusqlite::Error` if the DDL fails.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let version: i64 = db
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if version < 1 {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(
            "DROP TABLE IF EXISTS comments;
             DROP TABLE IF EXISTS sessions;",
        )?;
        tx.execute_batch(SCHEMA_V1_SQL)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
        tracing::info!("comment store migrated to schema v1");
    }

    Ok(())
}
