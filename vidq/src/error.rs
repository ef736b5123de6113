//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised outside a subsystem's own error type (logging setup).
///
/// Subsystems report through `ConfigError`, `CredentialError`,
/// `TransportError` and `SendError`; the binary wraps everything in `anyhow`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
