//! Codex CLI rollout decoder
//!
//! Decodes session logs from `~/.codex/sessions/YYYY/MM/DD/rollout-*.jsonl`
//! into normalized [`Message`] values. The format is a typed event stream
//! with no native branching, so the output is a linear sequence: every
//! message gets a monotonically increasing synthetic id (`codex-N`), a null
//! parent, and `is_sidechain = false`.
//!
//! Decoding is an accumulator walk: `reasoning` and `function_call` events
//! pile up as pending assistant content blocks until a boundary event
//! (`user_message`, `agent_message`, or a call output) flushes them as one
//! assistant message.

use crate::error::Result;
use crate::types::{
    truncate_prompt, ContentBlock, LogFormat, Message, Role, SessionMeta, ToolResultContent,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

use super::DecodedSession;

// ============================================
// Raw JSONL record types (serde deserialization)
// ============================================

/// Top-level event container for Codex JSONL records.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawEvent {
    timestamp: Option<String>,
    #[serde(rename = "type")]
    event_type: Option<String>,
    payload: serde_json::Value,
}

/// Session metadata payload (first record in file).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SessionMetaPayload {
    id: Option<String>,
    cwd: Option<String>,
    originator: Option<String>,
    git: Option<GitInfo>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct GitInfo {
    branch: Option<String>,
}

/// Response item payload subtypes, discriminated by `type`.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ResponseItemPayload {
    #[serde(rename = "type")]
    item_type: Option<String>,
    role: Option<String>,
    content: Option<Vec<RawBlock>>,
    name: Option<String>,
    arguments: Option<String>,
    call_id: Option<String>,
    output: Option<String>,
    summary: Option<Vec<serde_json::Value>>,
    encrypted_content: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
enum RawBlock {
    #[serde(rename = "input_text")]
    InputText { text: String },
    #[serde(rename = "output_text")]
    OutputText { text: String },
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Unknown,
}

impl RawBlock {
    fn text(&self) -> Option<&str> {
        match self {
            RawBlock::InputText { text }
            | RawBlock::OutputText { text }
            | RawBlock::Text { text } => Some(text),
            RawBlock::Unknown => None,
        }
    }
}

/// Event message payload subtypes.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct EventMsgPayload {
    #[serde(rename = "type")]
    msg_type: Option<String>,
    message: Option<String>,
}

/// Turn context payload.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TurnContextPayload {
    cwd: Option<String>,
    model: Option<String>,
}

// ============================================
// Decoding
// ============================================

/// Accumulator walk state: pending assistant content plus synthetic id
/// counter and metadata trackers.
struct Walk {
    messages: Vec<Message>,
    pending: Vec<ContentBlock>,
    pending_timestamp: String,
    next_id: usize,
    model: Option<String>,
}

impl Walk {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            pending: Vec::new(),
            pending_timestamp: String::new(),
            next_id: 0,
            model: None,
        }
    }

    fn synthetic_id(&mut self) -> String {
        let id = format!("codex-{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn push_message(&mut self, role: Role, timestamp: String, content: Vec<ContentBlock>) {
        let uuid = self.synthetic_id();
        let mut msg = Message::new(uuid, None, role);
        msg.timestamp = timestamp;
        msg.content = content;
        if role == Role::Assistant {
            msg.model = self.model.clone();
        }
        msg.derive_flags();
        self.messages.push(msg);
    }

    /// Flush any accumulated assistant blocks as one assistant message.
    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let content = std::mem::take(&mut self.pending);
        let timestamp = std::mem::take(&mut self.pending_timestamp);
        self.push_message(Role::Assistant, timestamp, content);
    }

    fn accumulate(&mut self, block: ContentBlock, timestamp: &str) {
        if self.pending.is_empty() {
            self.pending_timestamp = timestamp.to_string();
        }
        self.pending.push(block);
    }
}

/// Decode raw event values into a linear message sequence plus metadata.
pub fn decode_events(raw: &[serde_json::Value], meta: &mut SessionMeta) -> Vec<Message> {
    let mut walk = Walk::new();
    let mut first_ts: Option<String> = None;
    let mut last_ts: Option<String> = None;

    for value in raw {
        let event: RawEvent = match serde_json::from_value(value.clone()) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "event deserialization failed, skipping");
                continue;
            }
        };

        let timestamp = event.timestamp.clone().unwrap_or_default();
        if !timestamp.is_empty() {
            if first_ts.is_none() {
                first_ts = Some(timestamp.clone());
            }
            last_ts = Some(timestamp.clone());
        }

        match event.event_type.as_deref() {
            Some("session_meta") => {
                let payload: SessionMetaPayload =
                    serde_json::from_value(event.payload).unwrap_or_default();
                if let Some(id) = payload.id {
                    meta.session_id = id;
                }
                if meta.cwd.is_none() {
                    meta.cwd = payload.cwd;
                }
                if meta.originator.is_none() {
                    meta.originator = payload.originator;
                }
                if meta.git_branch.is_none() {
                    meta.git_branch = payload.git.and_then(|g| g.branch);
                }
            }
            Some("turn_context") => {
                let payload: TurnContextPayload =
                    serde_json::from_value(event.payload).unwrap_or_default();
                if let Some(model) = payload.model {
                    walk.model = Some(model);
                }
                if meta.cwd.is_none() {
                    meta.cwd = payload.cwd;
                }
            }
            Some("response_item") => {
                let payload: ResponseItemPayload =
                    serde_json::from_value(event.payload).unwrap_or_default();
                handle_response_item(&mut walk, payload, &timestamp);
            }
            Some("event_msg") => {
                let payload: EventMsgPayload =
                    serde_json::from_value(event.payload).unwrap_or_default();
                handle_event_msg(&mut walk, payload, &timestamp);
            }
            // Ignorable kinds
            Some("ghost_snapshot") | Some("turn_aborted") => {}
            Some(other) => {
                tracing::debug!(kind = other, "ignoring unknown event kind");
            }
            None => {}
        }
    }

    // Trailing assistant content with no boundary event after it
    walk.flush_pending();

    meta.model = walk.model.clone();
    meta.message_count = walk.messages.len();
    meta.started_at = first_ts.as_deref().and_then(parse_ts);
    meta.last_activity_at = last_ts.as_deref().and_then(parse_ts);

    if let Some(first_user) = walk
        .messages
        .iter()
        .find(|m| m.role == Role::User && !m.is_tool_result)
    {
        let text = first_user.plain_text();
        if !text.is_empty() {
            meta.first_prompt = truncate_prompt(&text);
        }
    }

    walk.messages
}

fn handle_response_item(walk: &mut Walk, payload: ResponseItemPayload, timestamp: &str) {
    match payload.item_type.as_deref() {
        Some("reasoning") => {
            walk.accumulate(
                ContentBlock::Thinking {
                    thinking: reasoning_text(&payload),
                    signature: None,
                },
                timestamp,
            );
        }
        Some("function_call") | Some("custom_tool_call") => {
            let input = payload
                .arguments
                .as_deref()
                .map(parse_arguments)
                .unwrap_or(serde_json::Value::Null);
            walk.accumulate(
                ContentBlock::ToolUse {
                    id: payload.call_id.unwrap_or_default(),
                    name: payload.name.unwrap_or_default(),
                    input,
                },
                timestamp,
            );
        }
        Some("function_call_output") | Some("custom_tool_call_output") => {
            walk.flush_pending();
            walk.push_message(
                Role::User,
                timestamp.to_string(),
                vec![ContentBlock::ToolResult {
                    tool_use_id: payload.call_id.unwrap_or_default(),
                    content: ToolResultContent::Text(payload.output.unwrap_or_default()),
                    is_error: None,
                }],
            );
        }
        Some("message") => {
            let text = payload
                .content
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .filter_map(RawBlock::text)
                .collect::<Vec<_>>()
                .join("\n");
            if text.is_empty() {
                return;
            }
            match payload.role.as_deref() {
                Some("assistant") => {
                    walk.accumulate(ContentBlock::text(text), timestamp);
                    walk.flush_pending();
                }
                // user or unspecified: a user turn flushes pending first
                _ => {
                    walk.flush_pending();
                    walk.push_message(
                        Role::User,
                        timestamp.to_string(),
                        vec![ContentBlock::text(text)],
                    );
                }
            }
        }
        _ => {}
    }
}

fn handle_event_msg(walk: &mut Walk, payload: EventMsgPayload, timestamp: &str) {
    match payload.msg_type.as_deref() {
        Some("user_message") => {
            walk.flush_pending();
            let text = payload.message.unwrap_or_default();
            walk.push_message(
                Role::User,
                timestamp.to_string(),
                vec![ContentBlock::text(text)],
            );
        }
        Some("agent_message") => {
            if let Some(text) = payload.message {
                walk.accumulate(ContentBlock::text(text), timestamp);
            }
            walk.flush_pending();
        }
        _ => {}
    }
}

/// Reasoning content: the joined summary texts, or a placeholder when only
/// encrypted content is present.
fn reasoning_text(payload: &ResponseItemPayload) -> String {
    let summary = payload
        .summary
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .filter_map(|s| s.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("\n");

    if !summary.is_empty() {
        summary
    } else if payload.encrypted_content.is_some() {
        "[encrypted reasoning]".to_string()
    } else {
        String::new()
    }
}

/// Tool call arguments arrive as a JSON string; keep the raw string when it
/// does not parse.
fn parse_arguments(arguments: &str) -> serde_json::Value {
    serde_json::from_str(arguments)
        .unwrap_or_else(|_| serde_json::Value::String(arguments.to_string()))
}

/// Decode one rollout file: linear messages plus the session metadata
/// record.
pub fn decode_session_file(path: &Path) -> Result<DecodedSession> {
    let raw = super::read_raw_lines(path)?;

    let session_id = super::session_id_from_path(path)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut meta = SessionMeta::new(session_id, LogFormat::Codex, &path.to_string_lossy());

    let messages = decode_events(&raw, &mut meta);

    Ok(DecodedSession { messages, meta })
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(json: &str) -> serde_json::Value {
        serde_json::from_str(json).unwrap()
    }

    fn decode(raw: &[serde_json::Value]) -> (Vec<Message>, SessionMeta) {
        let mut meta = SessionMeta::new("rollout-test", LogFormat::Codex, "/tmp/rollout.jsonl");
        let messages = decode_events(raw, &mut meta);
        (messages, meta)
    }

    #[test]
    fn test_linear_output_with_synthetic_ids() {
        let raw = vec![
            event(
                r#"{"timestamp":"2026-01-01T00:00:00Z","type":"event_msg","payload":{"type":"user_message","message":"fix the bug"}}"#,
            ),
            event(
                r#"{"timestamp":"2026-01-01T00:00:05Z","type":"event_msg","payload":{"type":"agent_message","message":"done"}}"#,
            ),
        ];

        let (messages, _) = decode(&raw);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].uuid, "codex-0");
        assert_eq!(messages[1].uuid, "codex-1");
        assert!(messages.iter().all(|m| m.parent_uuid.is_none()));
        assert!(messages.iter().all(|m| !m.is_sidechain));
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn test_reasoning_and_call_accumulate_until_flush() {
        let raw = vec![
            event(
                r#"{"timestamp":"T0","type":"event_msg","payload":{"type":"user_message","message":"list files"}}"#,
            ),
            event(
                r#"{"timestamp":"T1","type":"response_item","payload":{"type":"reasoning","summary":[{"type":"summary_text","text":"need to run ls"}]}}"#,
            ),
            event(
                r#"{"timestamp":"T2","type":"response_item","payload":{"type":"function_call","name":"shell","arguments":"{\"command\":[\"ls\"]}","call_id":"call_1"}}"#,
            ),
            event(
                r#"{"timestamp":"T3","type":"response_item","payload":{"type":"function_call_output","call_id":"call_1","output":"a.txt\nb.txt"}}"#,
            ),
            event(
                r#"{"timestamp":"T4","type":"event_msg","payload":{"type":"agent_message","message":"two files"}}"#,
            ),
        ];

        let (messages, _) = decode(&raw);
        assert_eq!(messages.len(), 4);

        // user, then one assistant message carrying thinking + tool_use
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(
            messages[1].content,
            vec![
                ContentBlock::Thinking {
                    thinking: "need to run ls".to_string(),
                    signature: None,
                },
                ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "shell".to_string(),
                    input: serde_json::json!({"command": ["ls"]}),
                },
            ]
        );
        assert_eq!(messages[1].timestamp, "T1");

        // the call output becomes a user-role tool_result message
        assert_eq!(messages[2].role, Role::User);
        assert!(messages[2].is_tool_result);
        assert_eq!(messages[2].tool_result_id.as_deref(), Some("call_1"));

        // final agent_message flushes as its own assistant message
        assert_eq!(messages[3].role, Role::Assistant);
        assert_eq!(messages[3].content, vec![ContentBlock::text("two files")]);
    }

    #[test]
    fn test_encrypted_reasoning_placeholder() {
        let raw = vec![
            event(
                r#"{"timestamp":"T0","type":"response_item","payload":{"type":"reasoning","summary":[],"encrypted_content":"gAAAA"}}"#,
            ),
            event(
                r#"{"timestamp":"T1","type":"event_msg","payload":{"type":"agent_message","message":"ok"}}"#,
            ),
        ];

        let (messages, _) = decode(&raw);
        assert_eq!(
            messages[0].content[0],
            ContentBlock::Thinking {
                thinking: "[encrypted reasoning]".to_string(),
                signature: None,
            }
        );
    }

    #[test]
    fn test_unparseable_arguments_kept_as_string() {
        assert_eq!(
            parse_arguments("not json"),
            serde_json::Value::String("not json".to_string())
        );
        assert_eq!(parse_arguments("{\"a\":1}"), serde_json::json!({"a": 1}));
    }

    #[test]
    fn test_metadata_extraction() {
        let raw = vec![
            event(
                r#"{"timestamp":"2026-01-01T00:00:00Z","type":"session_meta","payload":{"id":"sess-1","cwd":"/home/u/proj","originator":"codex_cli_rs","git":{"branch":"main"}}}"#,
            ),
            event(
                r#"{"timestamp":"2026-01-01T00:00:01Z","type":"turn_context","payload":{"cwd":"/home/u/proj","model":"gpt-5"}}"#,
            ),
            event(
                r#"{"timestamp":"2026-01-01T00:00:02Z","type":"event_msg","payload":{"type":"user_message","message":"hello codex"}}"#,
            ),
        ];

        let (_, meta) = decode(&raw);
        assert_eq!(meta.session_id, "sess-1");
        assert_eq!(meta.cwd.as_deref(), Some("/home/u/proj"));
        assert_eq!(meta.originator.as_deref(), Some("codex_cli_rs"));
        assert_eq!(meta.git_branch.as_deref(), Some("main"));
        assert_eq!(meta.model.as_deref(), Some("gpt-5"));
        assert_eq!(meta.first_prompt, "hello codex");
        assert_eq!(meta.message_count, 1);
        assert!(meta.started_at.is_some());
        assert!(meta.last_activity_at.is_some());
    }

    #[test]
    fn test_turn_aborted_and_ghost_snapshot_ignored() {
        let raw = vec![
            event(r#"{"timestamp":"T0","type":"ghost_snapshot","payload":{}}"#),
            event(r#"{"timestamp":"T1","type":"turn_aborted","payload":{"reason":"user"}}"#),
        ];

        let (messages, _) = decode(&raw);
        assert!(messages.is_empty());
    }
}
