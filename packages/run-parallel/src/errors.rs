//! Error types for run-parallel
//!
//! Provides unified error handling across the crate. Analysis never surfaces
//! these to its callers; they only escape from registration, configuration
//! and the CLI.

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for run-parallel operations
#[derive(Debug, Error)]
pub enum RunParallelError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Source registry error
    #[error("Registry error: {0}")]
    Registry(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RunParallelError {
    /// Create a parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        RunParallelError::Parse(msg.into())
    }

    /// Create a registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        RunParallelError::Registry(msg.into())
    }
}

/// Result type alias for run-parallel operations
pub type Result<T> = std::result::Result<T, RunParallelError>;
