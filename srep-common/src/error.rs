//! Common error types for SREP

use thiserror::Error;

/// Common result type for SREP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across SREP crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML config file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed delimited text
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}
