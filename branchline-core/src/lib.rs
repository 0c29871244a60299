//! # branchline-core
//!
//! Core library for branchline: reconstructs the true branching structure
//! of AI coding assistant session logs.
//!
//! Claude Code writes append-only JSONL logs whose records link through
//! `uuid`/`parentUuid`; retries and edited turns create sibling branches
//! that never remerge. This crate decodes those logs (plus the linear
//! Codex rollout format) into one normalized message model, builds the
//! message forest, resolves the canonical active path, extracts branch
//! points ordered newest-first, and computes minimap layout geometry.
//! Around that core sit the ambient layers: source discovery, a SQLite
//! session index with full-text search, config, and logging.
//!
//! ## Architecture
//!
//! ```text
//! raw JSONL ──> decode ──> Vec<Message> ──> tree::Forest
//!                                              │
//!                         branches::resolve_active_path
//!                                              │
//!                  active path ──> branches::branch_points
//!                                              │
//!                     path + branches ──> layout geometry
//! ```
//!
//! Forest construction and everything downstream is pure, synchronous
//! transformation over in-memory values: no I/O, no shared state, safe to
//! run for two sessions concurrently.

pub mod branches;
pub mod config;
pub mod decode;
pub mod discover;
pub mod error;
pub mod index;
pub mod ingest;
pub mod layout;
pub mod logging;
pub mod tree;
pub mod types;

pub use branches::{branch_points, resolve_active_path, BranchPoint};
pub use config::Config;
pub use error::{Error, Result};
pub use index::Index;
pub use layout::{
    compute_bar_heights, compute_branch_layout, estimate_content_length, hit_test_message_index,
    BranchLayout, OffshootLayout,
};
pub use tree::Forest;
pub use types::{ContentBlock, LogFormat, Message, Role, SessionMeta, TokenUsage};
