//! Centralized error types for mailhook.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailhook library.
#[derive(Error, Debug)]
pub enum HookError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified message file does not exist.
    #[error("Message file not found: {0}")]
    FileNotFound(PathBuf),

    /// The raw bytes could not be parsed as an RFC 5322 message.
    #[error("Invalid email message: {0}")]
    InvalidMessage(String),

    /// The configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The HTTP request could not be sent or its response could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The webhook payload could not be serialized.
    #[error("Failed to serialize webhook payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenience alias for `Result<T, HookError>`.
pub type Result<T> = std::result::Result<T, HookError>;

impl HookError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for HookError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
