//! SQLite-backed comment store.
//!
//! Comments are attached to a [`Selection`]: a line range on one side of one
//! file. All access goes through a `tokio_rusqlite::Connection`, which runs
//! the blocking SQLite calls on its own thread.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::selection::Selection;
use crate::types::{Comment, Session, Side};

/// Opens (or creates) the database at `path`, configures WAL mode and
/// applies schema migrations.
///
/// `busy_timeout` is set through the `Connection` method rather than a
/// PRAGMA string so pragma caching cannot swallow it.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened, WAL
/// configuration fails, or schema DDL fails.
pub async fn open_db(path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = Connection::open(path).await?;

    conn.call(|db| {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    conn.call(|db| {
        crate::schema::migrate(db)?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    Ok(conn)
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Resumes the most recent session for `repo_path + diff_mode`, or creates one.
///
/// Resuming bumps `updated_at`.
pub async fn detect_or_create_session(
    conn: &Connection,
    repo_path: &str,
    diff_mode: &str,
) -> Result<Session, tokio_rusqlite::Error> {
    let repo_path = repo_path.to_owned();
    let diff_mode = diff_mode.to_owned();

    conn.call(move |db| {
        let existing: Option<Session> = db
            .query_row(
                "SELECT id, repo_path, diff_mode, created_at, updated_at
                 FROM sessions
                 WHERE repo_path = ?1 AND diff_mode = ?2
                 ORDER BY updated_at DESC
                 LIMIT 1",
                rusqlite::params![&repo_path, &diff_mode],
                |r| {
                    Ok(Session {
                        id: r.get(0)?,
                        repo_path: r.get(1)?,
                        diff_mode: r.get(2)?,
                        created_at: r.get(3)?,
                        updated_at: r.get(4)?,
                    })
                },
            )
            .optional()?;

        let now = now_secs();
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let session = match existing {
            Some(mut session) => {
                tx.execute(
                    "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
                    rusqlite::params![now, &session.id],
                )?;
                session.updated_at = now;
                session
            }
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                tx.execute(
                    "INSERT INTO sessions (id, repo_path, diff_mode, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    rusqlite::params![&id, &repo_path, &diff_mode, now],
                )?;
                Session { id, repo_path, diff_mode, created_at: now, updated_at: now }
            }
        };
        tx.commit()?;
        Ok(session)
    })
    .await
}

/// Stores `body` against the range covered by `selection`.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the insert fails (including a
/// foreign-key violation for an unknown session).
pub async fn add_comment(
    conn: &Connection,
    session_id: &str,
    selection: &Selection,
    body: &str,
) -> Result<Comment, tokio_rusqlite::Error> {
    let comment = Comment {
        id: uuid::Uuid::new_v4().to_string(),
        session_id: session_id.to_owned(),
        file_path: selection.file.to_string(),
        side: selection.side,
        start_line: selection.start_line,
        end_line: selection.end_line,
        body: body.to_owned(),
        created_at: now_secs(),
    };
    let row = comment.clone();

    conn.call(move |db| {
        db.execute(
            "INSERT INTO comments
                 (id, session_id, file_path, side, start_line, end_line, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                &row.id,
                &row.session_id,
                &row.file_path,
                row.side.as_str(),
                row.start_line,
                row.end_line,
                &row.body,
                row.created_at,
            ],
        )?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    Ok(comment)
}

/// Loads every comment in `session_id`, ordered by file then start line.
pub async fn load_comments(
    conn: &Connection,
    session_id: &str,
) -> Result<Vec<Comment>, tokio_rusqlite::Error> {
    let session_id = session_id.to_owned();

    conn.call(move |db| {
        let mut stmt = db.prepare(
            "SELECT id, session_id, file_path, side, start_line, end_line, body, created_at
             FROM comments
             WHERE session_id = ?1
             ORDER BY file_path, start_line, created_at",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![&session_id], |r| {
                let side: String = r.get(3)?;
                Ok(Comment {
                    id: r.get(0)?,
                    session_id: r.get(1)?,
                    file_path: r.get(2)?,
                    side: Side::parse(&side).unwrap_or_default(),
                    start_line: r.get(4)?,
                    end_line: r.get(5)?,
                    body: r.get(6)?,
                    created_at: r.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    })
    .await
}

/// Deletes one comment. Returns whether a row was removed.
pub async fn delete_comment(conn: &Connection, comment_id: &str) -> Result<bool, tokio_rusqlite::Error> {
    let comment_id = comment_id.to_owned();
    conn.call(move |db| {
        let n = db.execute("DELETE FROM comments WHERE id = ?1", rusqlite::params![&comment_id])?;
        Ok(n > 0)
    })
    .await
}
