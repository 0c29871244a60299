//! Persistent session index
//!
//! SQLite-backed catalog of discovered sessions: metadata, hide/show
//! flags, and full-text search over summaries and first prompts. Message
//! content never lands here; sessions are re-decoded from their source
//! logs on demand, so dropping the index file loses nothing.

pub mod schema;

use crate::error::{Error, Result};
use crate::types::{LogFormat, SessionMeta};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// One row of the session listing.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub meta: SessionMeta,
    pub hidden: bool,
    pub indexed_at: DateTime<Utc>,
}

/// Index handle (single connection behind a mutex).
pub struct Index {
    conn: Mutex<Connection>,
}

impl Index {
    /// Open or create an index at the given path, applying migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        schema::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory index (tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Config("index connection mutex poisoned".to_string()))
    }

    /// Insert or update one session's metadata. The hidden flag survives
    /// re-indexing.
    pub fn upsert_session(&self, meta: &SessionMeta) -> Result<()> {
        let conn = self.lock()?;
        let project_id = meta
            .project_path
            .as_deref()
            .map(crate::discover::project_id);

        conn.execute(
            r#"
            INSERT INTO sessions (
                session_id, format, source_path, project_path, project_id,
                cwd, git_branch, originator, model, summary, first_prompt,
                message_count, started_at, last_activity_at, indexed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(session_id) DO UPDATE SET
                format = excluded.format,
                source_path = excluded.source_path,
                project_path = excluded.project_path,
                project_id = excluded.project_id,
                cwd = excluded.cwd,
                git_branch = excluded.git_branch,
                originator = excluded.originator,
                model = excluded.model,
                summary = excluded.summary,
                first_prompt = excluded.first_prompt,
                message_count = excluded.message_count,
                started_at = excluded.started_at,
                last_activity_at = excluded.last_activity_at,
                indexed_at = excluded.indexed_at
            "#,
            params![
                meta.session_id,
                meta.format.as_str(),
                meta.source_path,
                meta.project_path,
                project_id,
                meta.cwd,
                meta.git_branch,
                meta.originator,
                meta.model,
                meta.summary,
                meta.first_prompt,
                meta.message_count as i64,
                meta.started_at.map(|t| t.to_rfc3339()),
                meta.last_activity_at.map(|t| t.to_rfc3339()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch one session by id.
    pub fn get_session(&self, session_id: &str) -> Result<SessionRecord> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{} WHERE session_id = ?1", SELECT_SESSION),
            params![session_id],
            row_to_record,
        )
        .optional()?
        .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    /// List sessions, newest activity first. Hidden sessions are excluded
    /// unless `include_hidden` is set.
    pub fn list_sessions(&self, include_hidden: bool, limit: usize) -> Result<Vec<SessionRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "{} {} ORDER BY last_activity_at DESC LIMIT ?1",
            SELECT_SESSION,
            if include_hidden {
                ""
            } else {
                "WHERE hidden = 0"
            }
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], row_to_record)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Full-text search over summaries and first prompts.
    pub fn search_sessions(&self, query: &str, limit: usize) -> Result<Vec<SessionRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            r#"
            {} WHERE hidden = 0 AND session_id IN (
                SELECT session_id FROM sessions_fts WHERE sessions_fts MATCH ?1
            )
            ORDER BY last_activity_at DESC LIMIT ?2
            "#,
            SELECT_SESSION
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![query, limit as i64], row_to_record)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Set or clear a session's hidden flag.
    pub fn set_hidden(&self, session_id: &str, hidden: bool) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE sessions SET hidden = ?1 WHERE session_id = ?2",
            params![hidden as i64, session_id],
        )?;
        if changed == 0 {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }

    /// Total indexed session count.
    pub fn session_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .map_err(Into::into)
    }
}

const SELECT_SESSION: &str = r#"
    SELECT session_id, format, source_path, project_path, cwd, git_branch,
           originator, model, summary, first_prompt, message_count,
           started_at, last_activity_at, hidden, indexed_at
    FROM sessions
"#;

/// Timestamps are stored as RFC3339 strings; unparseable values read back
/// as `None`.
fn get_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    let format_str: String = row.get(1)?;
    let format = LogFormat::from_str(&format_str).unwrap_or(LogFormat::ClaudeCode);

    Ok(SessionRecord {
        meta: SessionMeta {
            session_id: row.get(0)?,
            format,
            source_path: row.get(2)?,
            project_path: row.get(3)?,
            cwd: row.get(4)?,
            git_branch: row.get(5)?,
            originator: row.get(6)?,
            model: row.get(7)?,
            summary: row.get(8)?,
            first_prompt: row.get(9)?,
            message_count: row.get::<_, i64>(10)? as usize,
            started_at: get_datetime(row, 11)?,
            last_activity_at: get_datetime(row, 12)?,
        },
        hidden: row.get::<_, i64>(13)? != 0,
        indexed_at: get_datetime(row, 14)?.unwrap_or_else(Utc::now),
    })
}
