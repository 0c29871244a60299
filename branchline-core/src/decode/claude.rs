//! Claude Code JSONL decoder
//!
//! Decodes session logs from `~/.claude/projects/[encoded-path]/*.jsonl`
//! into normalized [`Message`] values. Each line is a record tagged by
//! `type`; only non-meta `user`/`assistant` records carry conversation
//! content and survive into the message set. The remaining kinds
//! (`summary`, `progress`, `system`, `file-history-snapshot`,
//! `queue-operation`) are consulted for session metadata only.
//!
//! Records link to each other through `uuid`/`parentUuid`, which is what
//! the tree builder in [`crate::tree`] consumes; this decoder does not
//! order or link anything itself.

use crate::error::Result;
use crate::types::{
    truncate_prompt, ContentBlock, LogFormat, Message, Role, SessionMeta, TokenUsage,
    ToolResultContent,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

use super::DecodedSession;

// ============================================
// Raw JSONL record types (serde deserialization)
// ============================================

/// One line of a Claude Code session log.
///
/// Uses `#[serde(default)]` liberally to handle missing fields gracefully.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawRecord {
    uuid: Option<String>,
    parent_uuid: Option<String>,
    session_id: Option<String>,
    #[serde(rename = "type")]
    record_type: Option<String>,
    timestamp: Option<String>,
    cwd: Option<String>,
    git_branch: Option<String>,
    is_sidechain: Option<bool>,
    is_meta: Option<bool>,

    message: Option<RawMessage>,

    // summary records
    summary: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawMessage {
    role: Option<String>,
    model: Option<String>,
    content: Option<RawContent>,
    usage: Option<RawUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Blocks(Vec<RawBlock>),
}

impl Default for RawContent {
    fn default() -> Self {
        RawContent::Text(String::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "thinking")]
    Thinking {
        thinking: String,
        #[serde(default)]
        signature: Option<String>,
    },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: serde_json::Value,
        #[serde(default)]
        is_error: Option<bool>,
    },
    #[serde(rename = "image")]
    Image { source: ImageSource },
    // Catch-all for unknown block types
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ImageSource {
    media_type: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawUsage {
    input_tokens: Option<i64>,
    output_tokens: Option<i64>,
    cache_creation_input_tokens: Option<i64>,
    cache_read_input_tokens: Option<i64>,
}

// ============================================
// Decoding
// ============================================

/// Decode raw record values into an unordered Message set.
///
/// Skips records whose kind is not `user`/`assistant`, records missing a
/// `uuid` or `message` payload, and records flagged `isMeta`. No ordering
/// or linking happens here.
pub fn decode_records(raw: &[serde_json::Value]) -> Vec<Message> {
    let mut messages = Vec::new();

    for value in raw {
        let record: RawRecord = match serde_json::from_value(value.clone()) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "record deserialization failed, skipping");
                continue;
            }
        };

        if let Some(msg) = record_to_message(&record) {
            messages.push(msg);
        }
    }

    messages
}

/// Decode raw record values into a flat chronological thread, sorted by
/// timestamp (lexical ISO-8601 comparison).
///
/// This is the legacy linear view, also used for subagent sub-conversations
/// which never branch.
pub fn decode_chronological(raw: &[serde_json::Value]) -> Vec<Message> {
    let mut messages = decode_records(raw);
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    messages
}

/// Decode one session file: messages plus the session metadata record.
pub fn decode_session_file(path: &Path) -> Result<DecodedSession> {
    let raw = super::read_raw_lines(path)?;

    let session_id = super::session_id_from_path(path)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut meta = SessionMeta::new(
        session_id,
        LogFormat::ClaudeCode,
        &path.to_string_lossy(),
    );
    meta.project_path = decode_project_path(path).map(|p| p.to_string_lossy().to_string());

    let messages = decode_records(&raw);
    extract_meta(&raw, &messages, &mut meta);

    Ok(DecodedSession { messages, meta })
}

/// Convert a deserialized record to a normalized Message, or `None` if the
/// record is non-conversational.
fn record_to_message(record: &RawRecord) -> Option<Message> {
    let record_type = record.record_type.as_deref()?;
    if record_type != "user" && record_type != "assistant" {
        return None;
    }
    if record.is_meta.unwrap_or(false) {
        return None;
    }
    let uuid = record.uuid.as_ref()?;
    let raw_msg = record.message.as_ref()?;

    let role = match raw_msg.role.as_deref() {
        Some("assistant") => Role::Assistant,
        Some("system") => Role::System,
        // Records without an explicit role fall back to the record kind
        Some("user") | None => {
            if record_type == "assistant" {
                Role::Assistant
            } else {
                Role::User
            }
        }
        Some(other) => {
            tracing::warn!(role = other, "unknown role, treating as user");
            Role::User
        }
    };

    let content = match raw_msg.content.as_ref() {
        Some(RawContent::Text(text)) => vec![ContentBlock::text(text.clone())],
        Some(RawContent::Blocks(blocks)) => blocks.iter().filter_map(normalize_block).collect(),
        None => Vec::new(),
    };

    let mut msg = Message::new(uuid.clone(), record.parent_uuid.clone(), role);
    msg.timestamp = record.timestamp.clone().unwrap_or_default();
    msg.content = content;
    msg.model = raw_msg.model.clone();
    msg.usage = raw_msg.usage.as_ref().map(|u| TokenUsage {
        input_tokens: u.input_tokens,
        output_tokens: u.output_tokens,
        cache_creation_input_tokens: u.cache_creation_input_tokens,
        cache_read_input_tokens: u.cache_read_input_tokens,
    });
    msg.is_sidechain = record.is_sidechain.unwrap_or(false);
    msg.derive_flags();

    Some(msg)
}

/// Normalize one raw block into the typed content model.
///
/// Images become a text placeholder (the base64 payload is never retained);
/// unknown block kinds are dropped with a debug log.
fn normalize_block(block: &RawBlock) -> Option<ContentBlock> {
    match block {
        RawBlock::Text { text } => Some(ContentBlock::Text { text: text.clone() }),
        RawBlock::Thinking {
            thinking,
            signature,
        } => Some(ContentBlock::Thinking {
            thinking: thinking.clone(),
            signature: signature.clone(),
        }),
        RawBlock::ToolUse { id, name, input } => Some(ContentBlock::ToolUse {
            id: id.clone(),
            name: name.clone(),
            input: input.clone(),
        }),
        RawBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => Some(ContentBlock::ToolResult {
            tool_use_id: tool_use_id.clone(),
            content: normalize_tool_result_content(content),
            is_error: *is_error,
        }),
        RawBlock::Image { source } => {
            let media = source.media_type.as_deref().unwrap_or("unknown");
            Some(ContentBlock::text(format!("[image: {}]", media)))
        }
        RawBlock::Unknown => {
            tracing::debug!("dropping unknown content block kind");
            None
        }
    }
}

/// Tool result content arrives as either a bare string or a nested block
/// list; anything else is serialized to a string.
fn normalize_tool_result_content(value: &serde_json::Value) -> ToolResultContent {
    match value {
        serde_json::Value::String(s) => ToolResultContent::Text(s.clone()),
        serde_json::Value::Array(items) => {
            let blocks: Vec<ContentBlock> = items
                .iter()
                .filter_map(|item| {
                    serde_json::from_value::<RawBlock>(item.clone())
                        .ok()
                        .as_ref()
                        .and_then(normalize_block)
                })
                .collect();
            ToolResultContent::Blocks(blocks)
        }
        serde_json::Value::Null => ToolResultContent::Text(String::new()),
        other => ToolResultContent::Text(other.to_string()),
    }
}

/// Extract session metadata from the full raw record stream.
///
/// The summary comes from the *last* `summary`-kind record; the first
/// prompt from the first non-meta user record's text content; cwd, git
/// branch and model from first occurrence.
fn extract_meta(raw: &[serde_json::Value], messages: &[Message], meta: &mut SessionMeta) {
    for value in raw {
        let record: RawRecord = match serde_json::from_value(value.clone()) {
            Ok(r) => r,
            Err(_) => continue,
        };

        if record.record_type.as_deref() == Some("summary") {
            if let Some(summary) = record.summary {
                // Last summary record wins
                meta.summary = Some(summary);
            }
            continue;
        }

        if meta.cwd.is_none() {
            meta.cwd = record.cwd.clone();
        }
        if meta.git_branch.is_none() {
            meta.git_branch = record.git_branch.clone();
        }
        if let Some(sid) = record.session_id {
            if meta.session_id.is_empty() {
                meta.session_id = sid;
            }
        }
    }

    meta.message_count = messages.len();

    if meta.model.is_none() {
        meta.model = messages.iter().find_map(|m| m.model.clone());
    }

    if let Some(first_user) = messages
        .iter()
        .find(|m| m.role == Role::User && !m.is_tool_result)
    {
        let text = first_user.plain_text();
        if !text.is_empty() {
            meta.first_prompt = truncate_prompt(&text);
        }
    }

    let mut timestamps: Vec<&str> = messages
        .iter()
        .map(|m| m.timestamp.as_str())
        .filter(|t| !t.is_empty())
        .collect();
    timestamps.sort_unstable();
    meta.started_at = timestamps.first().and_then(|t| parse_ts(t));
    meta.last_activity_at = timestamps.last().and_then(|t| parse_ts(t));
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Decode the project path from a session file's parent directory name.
///
/// Path format: `~/.claude/projects/-home-user-dev-myproject/session.jsonl`.
/// The folder name is the project path with `/` replaced by `-`; paths that
/// themselves contain dashes cannot be recovered exactly.
pub fn decode_project_path(file_path: &Path) -> Option<std::path::PathBuf> {
    let folder_name = file_path.parent()?.file_name()?.to_str()?;

    if !folder_name.starts_with('-') {
        return None;
    }

    let decoded = folder_name.replacen('-', "/", 1).replace('-', "/");
    Some(std::path::PathBuf::from(decoded))
}
