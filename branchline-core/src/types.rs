//! Core domain types for branchline
//!
//! These types are the normalized message model that both supported log
//! formats decode into. The decoders in [`crate::decode`] produce them, the
//! forest/branch machinery in [`crate::tree`] and [`crate::branches`]
//! consumes them, and [`SessionMeta`] is the per-session record handed to
//! the index layer.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Message** | One normalized conversational turn with typed content blocks |
//! | **Content block** | One typed unit of content (text, thinking, tool call, tool result) |
//! | **Sidechain** | An abandoned branch created by a retry or an edited turn |
//! | **Active path** | The linear conversation shown by default |
//! | **Subagent** | A nested sub-conversation dispatched by a tool call, logged in its own file |
//!
//! Message timestamps are kept as the ISO-8601 strings the logs carry and
//! compared lexically; the empty string is the valid-but-unknown sentinel.
//! Only session-level metadata parses timestamps into [`chrono`] values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Log formats
// ============================================

/// Supported session log formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// `~/.claude/projects/*/*.jsonl` records with uuid/parentUuid links
    ClaudeCode,
    /// `~/.codex/sessions/**/rollout-*.jsonl` typed event streams (linear)
    Codex,
}

impl LogFormat {
    /// Returns the display name for this format
    pub fn display_name(&self) -> &'static str {
        match self {
            LogFormat::ClaudeCode => "Claude Code",
            LogFormat::Codex => "Codex",
        }
    }

    /// Returns the identifier used in index storage
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::ClaudeCode => "claude_code",
            LogFormat::Codex => "codex",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude_code" | "ClaudeCode" => Ok(LogFormat::ClaudeCode),
            "codex" | "Codex" => Ok(LogFormat::Codex),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

// ============================================
// Roles
// ============================================

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

// ============================================
// Content blocks
// ============================================

/// Content carried by a `tool_result` block: either a bare string or a
/// nested list of blocks, depending on what the tool returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for ToolResultContent {
    fn default() -> Self {
        ToolResultContent::Text(String::new())
    }
}

/// One typed unit of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text
    Text { text: String },
    /// Model reasoning/scratch content
    Thinking {
        thinking: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// A tool invocation request
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Result of a tool invocation, tied back by `tool_use_id`
    ToolResult {
        tool_use_id: String,
        content: ToolResultContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl ContentBlock {
    /// Convenience constructor for a text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

// ============================================
// Token usage
// ============================================

/// Token usage reported alongside an assistant message (if any).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub cache_creation_input_tokens: Option<i64>,
    pub cache_read_input_tokens: Option<i64>,
}

// ============================================
// Messages
// ============================================

/// A normalized, display-ready message.
///
/// `uuid` is unique and non-empty for anything entering the tree;
/// `parent_uuid == None` marks a forest root. A non-null parent that refers
/// to no known message silently promotes the node to root at tree build
/// time, never errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id within the session
    pub uuid: String,
    /// Parent message id; `None` marks a forest root
    pub parent_uuid: Option<String>,
    /// Author role
    pub role: Role,
    /// ISO-8601 timestamp; empty string means unknown
    pub timestamp: String,
    /// Typed content blocks
    pub content: Vec<ContentBlock>,
    /// Model that produced this message (assistant messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Token usage, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Whether the source record was flagged as a sidechain
    #[serde(default)]
    pub is_sidechain: bool,

    // Derived flags
    /// Whether the content carries a tool_result block
    #[serde(default)]
    pub is_tool_result: bool,
    /// Id of the first tool_result block, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result_id: Option<String>,
    /// Whether the first tool_result block reported an error
    #[serde(default)]
    pub is_error: bool,
    /// Id of a dispatched subagent, if this message contains a dispatch call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subagent_id: Option<String>,
    /// Human description of the dispatched subagent's task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subagent_description: Option<String>,
}

impl Message {
    /// Create a bare message with empty content and no derived flags.
    pub fn new(uuid: impl Into<String>, parent_uuid: Option<String>, role: Role) -> Self {
        Self {
            uuid: uuid.into(),
            parent_uuid,
            role,
            timestamp: String::new(),
            content: Vec::new(),
            model: None,
            usage: None,
            is_sidechain: false,
            is_tool_result: false,
            tool_result_id: None,
            is_error: false,
            subagent_id: None,
            subagent_description: None,
        }
    }

    /// Concatenated text of all `text` blocks.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    /// Derive tool-result and subagent-dispatch flags from the current
    /// content blocks. Decoders call this once after normalizing content.
    pub fn derive_flags(&mut self) {
        for block in &self.content {
            match block {
                ContentBlock::ToolResult {
                    tool_use_id,
                    is_error,
                    ..
                } if !self.is_tool_result => {
                    self.is_tool_result = true;
                    self.tool_result_id = Some(tool_use_id.clone());
                    self.is_error = is_error.unwrap_or(false);
                }
                ContentBlock::ToolUse { id, name, input } if is_subagent_dispatch(name) => {
                    self.subagent_id = Some(id.clone());
                    self.subagent_description = input
                        .get("description")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string());
                }
                _ => {}
            }
        }
    }
}

/// Whether a tool name denotes a subagent dispatch.
pub fn is_subagent_dispatch(tool_name: &str) -> bool {
    tool_name == "Task"
}

// ============================================
// Session metadata
// ============================================

/// Sentinel used when a session has no extractable first prompt.
pub const NO_PROMPT: &str = "No prompt";

/// Maximum length of the stored first prompt.
pub const FIRST_PROMPT_MAX_LEN: usize = 200;

/// Per-session record handed to the index layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Session id (from the log or derived from the file name)
    pub session_id: String,
    /// Which log format this session came from
    pub format: LogFormat,
    /// Path to the source session file
    pub source_path: String,
    /// Decoded project path, if known
    pub project_path: Option<String>,
    /// Working directory recorded in the log
    pub cwd: Option<String>,
    /// Git branch recorded in the log
    pub git_branch: Option<String>,
    /// Originating tool/frontend, if recorded (Codex `originator`)
    pub originator: Option<String>,
    /// Model name, if recorded
    pub model: Option<String>,
    /// Session summary (last `summary` record wins)
    pub summary: Option<String>,
    /// First non-meta user prompt, truncated; [`NO_PROMPT`] when absent
    pub first_prompt: String,
    /// Count of non-meta user/assistant records
    pub message_count: usize,
    /// First message timestamp seen
    pub started_at: Option<DateTime<Utc>>,
    /// Last message timestamp seen
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl SessionMeta {
    /// Create an empty meta record for a session file.
    pub fn new(session_id: impl Into<String>, format: LogFormat, source_path: &str) -> Self {
        Self {
            session_id: session_id.into(),
            format,
            source_path: source_path.to_string(),
            project_path: None,
            cwd: None,
            git_branch: None,
            originator: None,
            model: None,
            summary: None,
            first_prompt: NO_PROMPT.to_string(),
            message_count: 0,
            started_at: None,
            last_activity_at: None,
        }
    }
}

/// Truncate a prompt to [`FIRST_PROMPT_MAX_LEN`] characters on a char
/// boundary.
pub fn truncate_prompt(text: &str) -> String {
    if text.chars().count() <= FIRST_PROMPT_MAX_LEN {
        text.to_string()
    } else {
        text.chars().take(FIRST_PROMPT_MAX_LEN).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_round_trip() {
        assert_eq!(LogFormat::ClaudeCode.as_str(), "claude_code");
        assert_eq!(
            "claude_code".parse::<LogFormat>().unwrap(),
            LogFormat::ClaudeCode
        );
        assert_eq!("codex".parse::<LogFormat>().unwrap(), LogFormat::Codex);
        assert!("aider".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_content_block_tagging() {
        let json = r#"{"type":"tool_result","tool_use_id":"t1","content":"ok"}"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();
        match block {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                assert_eq!(tool_use_id, "t1");
                assert_eq!(content, ToolResultContent::Text("ok".to_string()));
                assert_eq!(is_error, None);
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_tool_result_nested_blocks() {
        let json = r#"{"type":"tool_result","tool_use_id":"t2","content":[{"type":"text","text":"hi"}],"is_error":true}"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();
        match block {
            ContentBlock::ToolResult {
                content, is_error, ..
            } => {
                assert_eq!(
                    content,
                    ToolResultContent::Blocks(vec![ContentBlock::text("hi")])
                );
                assert_eq!(is_error, Some(true));
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }

    #[test]
    fn test_derive_flags_tool_result() {
        let mut msg = Message::new("u1", None, Role::User);
        msg.content = vec![
            ContentBlock::ToolResult {
                tool_use_id: "call-1".to_string(),
                content: ToolResultContent::Text("boom".to_string()),
                is_error: Some(true),
            },
            ContentBlock::ToolResult {
                tool_use_id: "call-2".to_string(),
                content: ToolResultContent::Text("ok".to_string()),
                is_error: None,
            },
        ];
        msg.derive_flags();

        // First tool_result wins
        assert!(msg.is_tool_result);
        assert_eq!(msg.tool_result_id.as_deref(), Some("call-1"));
        assert!(msg.is_error);
    }

    #[test]
    fn test_derive_flags_subagent_dispatch() {
        let mut msg = Message::new("a1", Some("u1".to_string()), Role::Assistant);
        msg.content = vec![ContentBlock::ToolUse {
            id: "toolu_01".to_string(),
            name: "Task".to_string(),
            input: serde_json::json!({"description": "Explore the repo", "prompt": "..."}),
        }];
        msg.derive_flags();

        assert_eq!(msg.subagent_id.as_deref(), Some("toolu_01"));
        assert_eq!(msg.subagent_description.as_deref(), Some("Explore the repo"));
    }

    #[test]
    fn test_truncate_prompt() {
        let short = "hello";
        assert_eq!(truncate_prompt(short), "hello");

        let long = "x".repeat(500);
        assert_eq!(truncate_prompt(&long).chars().count(), FIRST_PROMPT_MAX_LEN);
    }
}
