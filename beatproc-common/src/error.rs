//! Common error types for the beat processor

use thiserror::Error;

/// Common result type for beat processor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the service crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Service-account credentials could not be read or used
    #[error("Credentials error: {0}")]
    Credentials(String),
}
