//! Error types for the metrics dashboard.
//!
//! Chart and grid operations degrade silently instead of failing; only the
//! outer surfaces (configuration files, the history feed and the terminal
//! loop) report errors through [`DashError`].

use thiserror::Error;

/// Result type alias for dashboard operations.
pub type Result<T> = std::result::Result<T, DashError>;

/// Errors that can occur outside the rendering core.
#[derive(Debug, Error)]
pub enum DashError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// History feed failure
    #[error("Feed error: {0}")]
    Feed(String),

    /// Terminal setup or drawing failure
    #[error("Terminal error: {0}")]
    Terminal(String),
}

impl DashError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a feed error
    pub fn feed(msg: impl Into<String>) -> Self {
        Self::Feed(msg.into())
    }

    /// Create a terminal error
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }
}
