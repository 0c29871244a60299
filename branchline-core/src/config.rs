//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/branchline/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/branchline/` (~/.config/branchline/)
//! - Data: `$XDG_DATA_HOME/branchline/` (~/.local/share/branchline/)
//! - State/Logs: `$XDG_STATE_HOME/branchline/` (~/.local/state/branchline/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Source log root overrides
    #[serde(default)]
    pub sources: SourceOverrides,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Override paths for the session log roots.
///
/// When unset, the roots default to `~/.claude` and `~/.codex`.
#[derive(Debug, Deserialize, Default)]
pub struct SourceOverrides {
    /// Override path for the Claude Code data root
    pub claude_root: Option<PathBuf>,
    /// Override path for the Codex data root
    pub codex_root: Option<PathBuf>,
}

impl SourceOverrides {
    /// Resolved Claude Code root (override or ~/.claude).
    pub fn claude_root(&self) -> Option<PathBuf> {
        self.claude_root
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".claude")))
    }

    /// Resolved Codex root (override or ~/.codex).
    pub fn codex_root(&self) -> Option<PathBuf> {
        self.codex_root
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".codex")))
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/branchline/config.toml` (~/.config/branchline/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("branchline").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite index)
    ///
    /// `$XDG_DATA_HOME/branchline/` (~/.local/share/branchline/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("branchline")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/branchline/` (~/.local/state/branchline/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("branchline")
    }

    /// Returns the session index file path
    ///
    /// `$XDG_DATA_HOME/branchline/index.db` (~/.local/share/branchline/index.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("index.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/branchline/branchline.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("branchline.log")
    }
}
