//! Credential error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::ConfigError;

/// OAuth error code for a refresh token that was revoked or expired.
const INVALID_GRANT: &str = "invalid_grant";

/// Errors that can occur during credential operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No token set has been stored yet.
    #[error("No access tokens available")]
    Unavailable,

    /// The stored access token has expired.
    #[error("Access token expired at {0}")]
    Expired(DateTime<Utc>),

    /// The authorization server rejected the request.
    #[error("Authorization server error: {error}{}", description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    Rejected {
        error: String,
        description: Option<String>,
    },

    /// The authorization server is overloaded or failing (5xx, 429).
    #[error("Authorization server unavailable: HTTP {status}")]
    ServerUnavailable { status: u16 },

    /// The consent flow did not produce an authorization code.
    #[error("Consent failed: {0}")]
    Consent(String),

    /// Network error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Parse error.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Persisting refreshed tokens failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// IO error (callback server).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CredentialError {
    /// Whether the user has to go through the browser consent again.
    ///
    /// Only a revoked or expired grant does; other rejections point at the
    /// client configuration and consent would not fix them.
    pub fn requires_consent(&self) -> bool {
        match self {
            Self::Unavailable => true,
            Self::Rejected { error, .. } => error == INVALID_GRANT,
            _ => false,
        }
    }

    /// Check if this error is transient and may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::ParseError(_) | Self::ServerUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(error: &str) -> CredentialError {
        CredentialError::Rejected {
            error: error.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_only_invalid_grant_requires_consent() {
        assert!(rejected("invalid_grant").requires_consent());
        assert!(!rejected("invalid_client").requires_consent());
        assert!(!rejected("HTTP 400 Bad Request").requires_consent());
        assert!(CredentialError::Unavailable.requires_consent());
    }

    #[test]
    fn test_server_unavailable_is_transient() {
        let err = CredentialError::ServerUnavailable { status: 503 };
        assert!(err.is_transient());
        assert!(!err.requires_consent());
        assert!(!rejected("invalid_grant").is_transient());
    }
}
