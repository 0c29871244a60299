//! Error types for branchline-core

use thiserror::Error;

/// Main error type for the branchline-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Session index (SQLite) error
    #[error("index error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Session not found
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

/// Result type alias for branchline-core
pub type Result<T> = std::result::Result<T, Error>;
