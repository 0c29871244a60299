//! Session ingestion
//!
//! Wires discovery, decoding, and the index together: enumerate session
//! files under the configured roots, decode each one's metadata, and
//! upsert it into the index. Per-file failures are logged and counted,
//! never fatal for the sync as a whole.

use crate::config::SourceOverrides;
use crate::decode;
use crate::discover::{self, SessionFile};
use crate::error::Result;
use crate::index::Index;

/// Outcome of one sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// Session files discovered
    pub discovered: usize,
    /// Sessions decoded and indexed
    pub indexed: usize,
    /// Files that failed to decode or index
    pub failed: usize,
}

/// Coordinates discovery, decoding, and indexing of session logs.
pub struct SyncCoordinator<'a> {
    sources: &'a SourceOverrides,
    index: &'a Index,
}

impl<'a> SyncCoordinator<'a> {
    pub fn new(sources: &'a SourceOverrides, index: &'a Index) -> Self {
        Self { sources, index }
    }

    /// Discover and index every session file.
    pub fn sync_all(&self) -> Result<SyncResult> {
        self.sync_all_with_progress(|_, _| {})
    }

    /// Discover and index every session file, reporting progress as
    /// `(current, total)` after each file.
    pub fn sync_all_with_progress<F>(&self, mut progress: F) -> Result<SyncResult>
    where
        F: FnMut(usize, usize),
    {
        let files = discover::discover_all(self.sources)?;
        let total = files.len();
        let mut result = SyncResult {
            discovered: total,
            ..Default::default()
        };

        for (i, file) in files.iter().enumerate() {
            match self.sync_one(file) {
                Ok(()) => result.indexed += 1,
                Err(e) => {
                    tracing::warn!(
                        path = %file.path.display(),
                        error = %e,
                        "failed to index session"
                    );
                    result.failed += 1;
                }
            }
            progress(i + 1, total);
        }

        tracing::info!(
            discovered = result.discovered,
            indexed = result.indexed,
            failed = result.failed,
            "sync complete"
        );
        Ok(result)
    }

    fn sync_one(&self, file: &SessionFile) -> Result<()> {
        let decoded = decode::decode_session_file(&file.path)?;
        self.index.upsert_session(&decoded.meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write_claude_session(root: &PathBuf, name: &str, lines: &[&str]) {
        let dir = root.join("projects/-home-u-proj");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.jsonl", name)), lines.join("\n")).unwrap();
    }

    #[test]
    fn test_sync_indexes_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let claude_root = dir.path().to_path_buf();

        write_claude_session(
            &claude_root,
            "sess-1",
            &[
                r#"{"type":"summary","summary":"Build fix"}"#,
                r#"{"type":"user","uuid":"u1","parentUuid":null,"timestamp":"2026-01-01T00:00:00Z","message":{"role":"user","content":"fix the build"}}"#,
                r#"{"type":"assistant","uuid":"a1","parentUuid":"u1","timestamp":"2026-01-01T00:00:05Z","message":{"role":"assistant","content":[{"type":"text","text":"done"}]}}"#,
            ],
        );

        let sources = SourceOverrides {
            claude_root: Some(claude_root),
            codex_root: Some(dir.path().join("no-codex")),
        };
        let index = Index::open_in_memory().unwrap();

        let mut ticks = Vec::new();
        let result = SyncCoordinator::new(&sources, &index)
            .sync_all_with_progress(|current, total| ticks.push((current, total)))
            .unwrap();

        assert_eq!(result.discovered, 1);
        assert_eq!(result.indexed, 1);
        assert_eq!(result.failed, 0);
        assert_eq!(ticks, vec![(1, 1)]);

        let record = index.get_session("sess-1").unwrap();
        assert_eq!(record.meta.summary.as_deref(), Some("Build fix"));
        assert_eq!(record.meta.first_prompt, "fix the build");
        assert_eq!(record.meta.message_count, 2);
        assert_eq!(
            record.meta.project_path.as_deref(),
            Some("/home/u/proj")
        );
    }

    #[test]
    fn test_sync_empty_roots() {
        let dir = tempfile::tempdir().unwrap();
        let sources = SourceOverrides {
            claude_root: Some(dir.path().join("a")),
            codex_root: Some(dir.path().join("b")),
        };
        let index = Index::open_in_memory().unwrap();

        let result = SyncCoordinator::new(&sources, &index).sync_all().unwrap();
        assert_eq!(result.discovered, 0);
        assert_eq!(result.indexed, 0);
    }
}
