//! Error types shared by the bank logo crates

use thiserror::Error;

/// Result type alias for bank logo operations
pub type Result<T> = std::result::Result<T, LogoError>;

/// Main error type for run-level failures
///
/// Per-image failures are not represented here; they are classified outcomes
/// of the matching engine and never abort a run.
#[derive(Error, Debug)]
pub enum LogoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl LogoError {
    /// Create a registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid path error
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }
}
