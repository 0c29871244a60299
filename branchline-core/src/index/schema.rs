//! Session index schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//! The index stores per-session metadata only; message content is decoded
//! from the source logs on demand, so the whole index is regenerable.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: sessions table plus full-text search over summaries and
    // first prompts, kept in sync by triggers
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        session_id       TEXT PRIMARY KEY,
        format           TEXT NOT NULL,
        source_path      TEXT NOT NULL,
        project_path     TEXT,
        project_id       TEXT,
        cwd              TEXT,
        git_branch       TEXT,
        originator       TEXT,
        model            TEXT,
        summary          TEXT,
        first_prompt     TEXT NOT NULL DEFAULT 'No prompt',
        message_count    INTEGER NOT NULL DEFAULT 0,
        started_at       DATETIME,
        last_activity_at DATETIME,
        hidden           INTEGER NOT NULL DEFAULT 0,
        indexed_at       DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_last_activity
        ON sessions(last_activity_at DESC);
    CREATE INDEX IF NOT EXISTS idx_sessions_project
        ON sessions(project_id);

    CREATE VIRTUAL TABLE IF NOT EXISTS sessions_fts USING fts5(
        session_id UNINDEXED,
        summary,
        first_prompt,
        content='sessions',
        content_rowid='rowid'
    );

    CREATE TRIGGER IF NOT EXISTS sessions_ai AFTER INSERT ON sessions BEGIN
        INSERT INTO sessions_fts(rowid, session_id, summary, first_prompt)
        VALUES (new.rowid, new.session_id, new.summary, new.first_prompt);
    END;

    CREATE TRIGGER IF NOT EXISTS sessions_ad AFTER DELETE ON sessions BEGIN
        INSERT INTO sessions_fts(sessions_fts, rowid, session_id, summary, first_prompt)
        VALUES ('delete', old.rowid, old.session_id, old.summary, old.first_prompt);
    END;

    CREATE TRIGGER IF NOT EXISTS sessions_au AFTER UPDATE ON sessions BEGIN
        INSERT INTO sessions_fts(sessions_fts, rowid, session_id, summary, first_prompt)
        VALUES ('delete', old.rowid, old.session_id, old.summary, old.first_prompt);
        INSERT INTO sessions_fts(rowid, session_id, summary, first_prompt)
        VALUES (new.rowid, new.session_id, new.summary, new.first_prompt);
    END;
    "#,
];

/// Apply pending migrations to bring the database to [`SCHEMA_VERSION`].
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current {
            tracing::info!(version, "applying index migration");
            conn.execute_batch(migration)?;
            conn.pragma_update(None, "user_version", version)?;
        }
    }

    Ok(())
}
