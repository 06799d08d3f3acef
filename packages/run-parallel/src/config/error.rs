//! Configuration error types

use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Range validation error
    #[error("Invalid value for field '{field}': {value}. {hint}")]
    Range {
        field: String,
        value: String,
        hint: String,
    },

    /// Malformed worker count
    #[error("Invalid worker count '{0}'. Use a positive integer or 'auto'")]
    WorkerCount(String),

    /// Thread-unsafe function entry without a module part
    #[error("Invalid thread-unsafe function '{0}'. Use a fully qualified path such as 'std::env::set_var'")]
    FunctionPath(String),

    /// Environment variable could not be parsed
    #[error("Invalid value '{value}' for environment variable {var}")]
    Env { var: String, value: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
