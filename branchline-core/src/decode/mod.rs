//! Session log decoders
//!
//! Two decoders share one output shape: [`claude`] handles Claude Code
//! records (uuid/parentUuid links, native branching), [`codex`] handles
//! Codex rollout event streams (inherently linear). Both are free functions
//! producing [`Message`] values; the caller selects one based on which
//! format a file belongs to.
//!
//! # Error Handling
//!
//! Malformed input data is the normal case here, not the exception: logs
//! are append-only files that may be read mid-write or produced by varying
//! tool versions. Malformed JSON lines are skipped with a warning, a
//! missing file yields an empty result, and records with missing required
//! fields are dropped rather than failing the whole decode.

pub mod claude;
pub mod codex;

use crate::error::Result;
use crate::types::{LogFormat, Message, SessionMeta};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A fully decoded session: normalized messages plus the metadata record
/// handed to the index layer.
#[derive(Debug, Clone)]
pub struct DecodedSession {
    pub messages: Vec<Message>,
    pub meta: SessionMeta,
}

/// Detect the log format of a session file from its path.
///
/// Codex rollout files are named `rollout-*.jsonl` under a `sessions/`
/// date hierarchy; everything else that looks like a session log is
/// treated as Claude Code.
pub fn detect_format(path: &Path) -> LogFormat {
    let is_rollout = path
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.starts_with("rollout-"))
        .unwrap_or(false);

    if is_rollout {
        LogFormat::Codex
    } else {
        LogFormat::ClaudeCode
    }
}

/// Decode one session file, dispatching on [`detect_format`].
pub fn decode_session_file(path: &Path) -> Result<DecodedSession> {
    match detect_format(path) {
        LogFormat::ClaudeCode => claude::decode_session_file(path),
        LogFormat::Codex => codex::decode_session_file(path),
    }
}

/// Read a JSONL file into parsed values, one per line.
///
/// A missing file yields an empty list. Empty lines and lines that fail
/// to parse as JSON are skipped with a warning.
pub(crate) fn read_raw_lines(path: &Path) -> Result<Vec<serde_json::Value>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "session file not found, treating as empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let reader = BufReader::new(file);
    let mut values = Vec::new();
    let mut line_number = 0usize;

    for line_result in reader.lines() {
        line_number += 1;
        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = line_number,
                    error = %e,
                    "read error, skipping line"
                );
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str(&line) {
            Ok(v) => values.push(v),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = line_number,
                    error = %e,
                    "malformed JSON line skipped"
                );
            }
        }
    }

    Ok(values)
}

/// Extract the session id from a file name stem.
pub(crate) fn session_id_from_path(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_format(Path::new(
                "/home/u/.codex/sessions/2026/01/15/rollout-2026-01-15T10-00-00-abc.jsonl"
            )),
            LogFormat::Codex
        );
        assert_eq!(
            detect_format(Path::new(
                "/home/u/.claude/projects/-home-u-dev-proj/b4749c81.jsonl"
            )),
            LogFormat::ClaudeCode
        );
    }

    #[test]
    fn test_read_raw_lines_missing_file() {
        let values = read_raw_lines(Path::new("/nonexistent/session.jsonl")).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_read_raw_lines_skips_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        let mut f = File::create(&path).unwrap();
        writeln!(f, r#"{{"type":"user"}}"#).unwrap();
        writeln!(f, "not json at all").unwrap();
        writeln!(f).unwrap();
        writeln!(f, r#"{{"type":"assistant"}}"#).unwrap();

        let values = read_raw_lines(&path).unwrap();
        assert_eq!(values.len(), 2);
    }
}
