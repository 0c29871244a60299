//! branchline - session browser for AI coding assistant logs
//!
//! Syncs Claude Code and Codex session logs into a local index and lets
//! you inspect each session's true branching structure: the active path,
//! the abandoned branches at every fork, and minimap geometry.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Index: $XDG_DATA_HOME/branchline/index.db
//! - Logs: $XDG_STATE_HOME/branchline/branchline.log
//! - Config: $XDG_CONFIG_HOME/branchline/config.toml

use anyhow::{Context, Result};
use branchline_core::branches::{branch_points, resolve_active_path};
use branchline_core::decode;
use branchline_core::index::{Index, SessionRecord};
use branchline_core::layout::{compute_bar_heights, compute_branch_layout, estimate_path_lengths};
use branchline_core::tree::Forest;
use branchline_core::types::{ContentBlock, Message, Role};
use branchline_core::{Config, SessionMeta};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

#[derive(Parser)]
#[command(name = "branchline")]
#[command(about = "Browse the branching structure of AI coding assistant sessions")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover session logs and refresh the index
    Sync {
        /// Discover files but don't index them
        #[arg(long)]
        dry_run: bool,
    },
    /// List indexed sessions, newest first
    List {
        /// Include hidden sessions
        #[arg(long)]
        all: bool,
        /// Maximum number of sessions to show
        #[arg(short, long, default_value = "25")]
        limit: usize,
    },
    /// Show a session's active conversation path
    Show {
        /// Session id
        session_id: String,
        /// Emit the active path as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the branch points of a session
    Branches {
        /// Session id
        session_id: String,
        /// Emit branch points and layout geometry as JSON
        #[arg(long)]
        json: bool,
    },
    /// Full-text search over session summaries and first prompts
    Search {
        /// FTS query
        query: String,
        #[arg(short, long, default_value = "25")]
        limit: usize,
    },
    /// Hide a session from listings
    Hide { session_id: String },
    /// Unhide a session
    Unhide { session_id: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = branchline_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    tracing::info!("branchline starting");

    let index_path = Config::database_path();
    let index = Index::open(&index_path).context("failed to open session index")?;

    match args.command {
        Command::Sync { dry_run } => cmd_sync(&config, &index, dry_run),
        Command::List { all, limit } => cmd_list(&index, all, limit),
        Command::Show { session_id, json } => cmd_show(&index, &session_id, json),
        Command::Branches { session_id, json } => cmd_branches(&index, &session_id, json),
        Command::Search { query, limit } => cmd_search(&index, &query, limit),
        Command::Hide { session_id } => {
            index.set_hidden(&session_id, true)?;
            println!("Hidden {}", session_id);
            Ok(())
        }
        Command::Unhide { session_id } => {
            index.set_hidden(&session_id, false)?;
            println!("Unhidden {}", session_id);
            Ok(())
        }
    }
}

fn cmd_sync(config: &Config, index: &Index, dry_run: bool) -> Result<()> {
    let files = branchline_core::discover::discover_all(&config.sources)
        .context("failed to discover session files")?;
    println!("Discovered {} session file(s)", files.len());

    if dry_run {
        for file in &files {
            println!(
                "  {} [{}] {}",
                file.session_id,
                file.format.display_name(),
                file.path.display()
            );
        }
        println!("\nDry run - no sync performed");
        return Ok(());
    }

    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .context("bad progress template")?,
    );

    let coordinator = branchline_core::ingest::SyncCoordinator::new(&config.sources, index);
    let result = coordinator
        .sync_all_with_progress(|current, _total| bar.set_position(current as u64))
        .context("sync failed")?;
    bar.finish_and_clear();

    println!(
        "Indexed {} session(s), {} failed",
        result.indexed, result.failed
    );
    Ok(())
}

fn cmd_list(index: &Index, all: bool, limit: usize) -> Result<()> {
    let sessions = index.list_sessions(all, limit)?;
    if sessions.is_empty() {
        println!("No sessions indexed. Run `branchline sync` first.");
        return Ok(());
    }

    for record in &sessions {
        print_session_line(record);
    }
    Ok(())
}

fn cmd_show(index: &Index, session_id: &str, json: bool) -> Result<()> {
    let (meta, active, _points) = load_session(index, session_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&active)?);
        return Ok(());
    }

    if let Some(summary) = &meta.summary {
        println!("# {}\n", summary);
    }
    for message in &active {
        print_message(message);
    }
    Ok(())
}

fn cmd_branches(index: &Index, session_id: &str, json: bool) -> Result<()> {
    let (_, active, points) = load_session(index, session_id)?;

    if json {
        let lengths = estimate_path_lengths(&active);
        let heights = compute_bar_heights(&lengths, 1000.0, 4.0);
        let layout = compute_branch_layout(&heights, &lengths, &points);
        let out = serde_json::json!({
            "branch_points": points,
            "layout": layout,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if points.is_empty() {
        println!("No branch points - the session is linear.");
        return Ok(());
    }

    for point in &points {
        println!(
            "Fork at message {} ({}) with {} path(s):",
            point.message_index,
            point.fork_message_uuid,
            point.paths.len()
        );
        for (i, path) in point.paths.iter().enumerate() {
            let marker = if i == 0 { "active" } else { "abandoned" };
            let preview = path
                .first()
                .map(|m| truncate(&m.plain_text(), 60))
                .unwrap_or_default();
            println!(
                "  [{}] {} message(s), starts {} - {}",
                marker,
                path.len(),
                path.first().map(|m| m.timestamp.as_str()).unwrap_or(""),
                preview
            );
        }
    }
    Ok(())
}

fn cmd_search(index: &Index, query: &str, limit: usize) -> Result<()> {
    let sessions = index.search_sessions(query, limit)?;
    if sessions.is_empty() {
        println!("No matches for '{}'", query);
        return Ok(());
    }
    for record in &sessions {
        print_session_line(record);
    }
    Ok(())
}

/// Load a session from its source log: active path plus branch points.
fn load_session(
    index: &Index,
    session_id: &str,
) -> Result<(SessionMeta, Vec<Message>, Vec<branchline_core::BranchPoint>)> {
    let record = index.get_session(session_id)?;
    let decoded = decode::decode_session_file(Path::new(&record.meta.source_path))
        .with_context(|| format!("failed to decode {}", record.meta.source_path))?;

    let forest = Forest::build(decoded.messages);
    if forest.duplicate_uuid_count() > 0 {
        eprintln!(
            "warning: {} duplicate message uuid(s) collapsed",
            forest.duplicate_uuid_count()
        );
    }
    let active = resolve_active_path(&forest);
    let points = branch_points(&forest, &active);
    Ok((record.meta, active, points))
}

fn print_session_line(record: &SessionRecord) {
    let when = record
        .meta
        .last_activity_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let title = record
        .meta
        .summary
        .as_deref()
        .unwrap_or(&record.meta.first_prompt);
    println!(
        "{}  {:11}  {:4} msgs  {}{}",
        when,
        record.meta.format.display_name(),
        record.meta.message_count,
        truncate(title, 70),
        if record.hidden { "  [hidden]" } else { "" }
    );
    println!("    {}", record.meta.session_id);
}

fn print_message(message: &Message) {
    let role = match message.role {
        Role::User if message.is_tool_result => "tool",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    };
    println!("--- {} ({})", role, message.timestamp);
    for block in &message.content {
        match block {
            ContentBlock::Text { text } => println!("{}", text),
            ContentBlock::Thinking { thinking, .. } => {
                println!("[thinking] {}", truncate(thinking, 200))
            }
            ContentBlock::ToolUse { name, input, .. } => {
                println!("[tool: {}] {}", name, truncate(&input.to_string(), 120))
            }
            ContentBlock::ToolResult { .. } => println!("[tool result]"),
        }
    }
    println!();
}

fn truncate(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max {
        single_line
    } else {
        let cut: String = single_line.chars().take(max).collect();
        format!("{}...", cut)
    }
}
