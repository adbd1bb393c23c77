//! Comment store lifecycle: open, migrate, sessions, range comments.

use scrollrev_core::db;
use scrollrev_core::selection::SelectionEngine;
use scrollrev_core::types::{FileRef, Side};

fn temp_db_path() -> String {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.keep().join("test.db");
    path.to_string_lossy().to_string()
}

#[tokio::test]
async fn comments_round_through_a_session() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();

    let version: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row(
                "SELECT MAX(version) FROM schema_version",
                [],
                |r| r.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(version, 1, "schema_version should be 1");

    let journal: String = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(
                db.query_row("PRAGMA journal_mode", [], |r| r.get(0))?,
            )
        })
        .await
        .unwrap();
    assert_eq!(journal, "wal", "journal_mode should be wal");

    let session = db::detect_or_create_session(&conn, "/tmp/repo", "unstaged")
        .await
        .unwrap();
    assert!(!session.id.is_empty());
    let resumed = db::detect_or_create_session(&conn, "/tmp/repo", "unstaged")
        .await
        .unwrap();
    assert_eq!(resumed.id, session.id, "same repo and mode resumes");
    let other = db::detect_or_create_session(&conn, "/tmp/repo", "staged")
        .await
        .unwrap();
    assert_ne!(other.id, session.id, "different mode = new session");

    // Build the range the way the UI does: drag from 10 up to 3.
    let file = FileRef::new("src/lib.rs");
    let mut engine = SelectionEngine::new();
    engine.click(10, Side::New, &file, false);
    engine.extend(3, Side::New, &file);
    let selection = engine.current().unwrap().clone();

    let saved = db::add_comment(&conn, &session.id, &selection, "rename this")
        .await
        .unwrap();
    assert_eq!((saved.start_line, saved.end_line), (3, 10));

    engine.click(2, Side::Old, &FileRef::new("a.rs"), false);
    let single = engine.current().unwrap().clone();
    db::add_comment(&conn, &session.id, &single, "why?").await.unwrap();

    let comments = db::load_comments(&conn, &session.id).await.unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].file_path, "a.rs", "ordered by file path");
    assert_eq!(comments[0].side, Side::Old);
    assert_eq!(comments[1], saved);

    assert!(db::load_comments(&conn, &other.id).await.unwrap().is_empty());

    assert!(db::delete_comment(&conn, &saved.id).await.unwrap());
    assert!(!db::delete_comment(&conn, &saved.id).await.unwrap());

    // A second connection sees what the first wrote.
    let conn2 = db::open_db(&path).await.unwrap();
    let remaining = db::load_comments(&conn2, &session.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].body, "why?");
}

#[tokio::test]
async fn comment_for_unknown_session_is_rejected() {
    let conn = db::open_db(&temp_db_path()).await.unwrap();
    let mut engine = SelectionEngine::new();
    engine.click(1, Side::New, &FileRef::new("x"), false);
    let result = db::add_comment(&conn, "no-such-session", engine.current().unwrap(), "hi").await;
    assert!(result.is_err(), "foreign keys are enforced");
}

#[tokio::test]
async fn migration_handles_legacy_db() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("legacy.db").to_string_lossy().to_string();

    // An unversioned database with an older sessions table.
    {
        let db = rusqlite::Connection::open(&path).unwrap();
        db.execute_batch(
            "CREATE TABLE sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                repo_path TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            INSERT INTO sessions (repo_path, created_at) VALUES ('/old', '2024-01-01');",
        )
        .unwrap();
    }

    let conn = db::open_db(&path).await.unwrap();
    let session = db::detect_or_create_session(&conn, "/test", "staged")
        .await
        .unwrap();
    assert!(!session.id.is_empty());

    let count: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(
                db.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?,
            )
        })
        .await
        .unwrap();
    assert_eq!(count, 1, "only the new session should exist");
}
