//! Session file discovery
//!
//! Enumerates session log files under the configured source roots:
//! `projects/*/*.jsonl` for Claude Code and
//! `sessions/YYYY/MM/DD/rollout-*.jsonl` for Codex. Discovery is pure
//! enumeration; decoding happens later, per file, on demand.

use crate::config::SourceOverrides;
use crate::decode::claude::decode_project_path;
use crate::error::Result;
use crate::types::LogFormat;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// One discovered session log file.
#[derive(Debug, Clone)]
pub struct SessionFile {
    pub path: PathBuf,
    pub format: LogFormat,
    /// Session id derived from the file name stem
    pub session_id: String,
    pub modified_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
    /// Decoded project path (Claude Code only)
    pub project_path: Option<PathBuf>,
}

/// Discover every session file under both source roots.
///
/// A missing root yields no files, not an error. Subagent files
/// (`agent-*.jsonl`) are excluded here; they are loaded lazily via
/// [`subagent_file`] when a parent session references them.
pub fn discover_all(sources: &SourceOverrides) -> Result<Vec<SessionFile>> {
    let mut files = Vec::new();

    if let Some(root) = sources.claude_root() {
        files.extend(discover_under(
            &root,
            "projects/*/*.jsonl",
            LogFormat::ClaudeCode,
        )?);
    }
    if let Some(root) = sources.codex_root() {
        files.extend(discover_under(
            &root,
            "sessions/*/*/*/rollout-*.jsonl",
            LogFormat::Codex,
        )?);
    }

    // Newest activity first
    files.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));

    tracing::debug!(count = files.len(), "discovered session files");
    Ok(files)
}

fn discover_under(root: &Path, pattern: &str, format: LogFormat) -> Result<Vec<SessionFile>> {
    if !root.exists() {
        tracing::debug!(root = %root.display(), "source root missing, skipping");
        return Ok(Vec::new());
    }

    let full_pattern = root.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let mut files = Vec::new();
    let paths = glob::glob(&pattern_str)
        .map_err(|e| crate::error::Error::Config(format!("bad glob pattern: {}", e)))?;

    for entry in paths {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable path during discovery");
                continue;
            }
        };

        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };
        // Subagent files belong to a parent session, not the listing
        if format == LogFormat::ClaudeCode && stem.starts_with("agent-") {
            continue;
        }

        let metadata = std::fs::metadata(&path).ok();
        let modified_at = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);
        let size_bytes = metadata.map(|m| m.len()).unwrap_or(0);

        let project_path = if format == LogFormat::ClaudeCode {
            decode_project_path(&path)
        } else {
            None
        };

        files.push(SessionFile {
            path,
            format,
            session_id: stem,
            modified_at,
            size_bytes,
            project_path,
        });
    }

    Ok(files)
}

/// Locate a subagent's session file next to its parent session file.
///
/// Subagent conversations live in `agent-<id>.jsonl` in the same project
/// directory as the parent; they are decoded independently and never
/// merged into the parent's tree.
pub fn subagent_file(parent_session_path: &Path, agent_id: &str) -> Option<PathBuf> {
    let dir = parent_session_path.parent()?;
    let candidate = dir.join(format!("agent-{}.jsonl", agent_id));
    if candidate.exists() {
        Some(candidate)
    } else {
        None
    }
}

/// Deterministic project id: truncated SHA-256 of the project path.
pub fn project_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let hash = hasher.finalize();
    hex::encode(hash)[..16].to_string()
}
