//! Error types for rexctl

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for rexctl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rexctl
#[derive(Debug, Error)]
pub enum Error {
    /// The env file to load does not exist
    #[error("env file not found: {}", .0.display())]
    EnvFileNotFound(PathBuf),

    /// A required setting is absent or empty
    #[error("{0} is not set")]
    MissingSetting(&'static str),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Telegram Bot API error
    #[error("telegram error: {0}")]
    Telegram(String),

    /// Local model server error
    #[error("model server error: {0}")]
    ModelServer(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
