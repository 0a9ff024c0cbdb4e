//! Error types for the Pitchguard service.

use thiserror::Error;

/// Main error type for Pitchguard operations.
///
/// Rate limit and validation outcomes are not errors; they are returned as
/// values. This type only covers startup and serving failures.
#[derive(Error, Debug)]
pub enum GuardError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for GuardError {
    fn from(err: ::config::ConfigError) -> Self {
        GuardError::Config(err.to_string())
    }
}

/// Result type alias for Pitchguard operations.
pub type Result<T> = std::result::Result<T, GuardError>;
