//! Core credential types.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Token set as returned by the Google token endpoint and persisted in
/// `accessTokens`. Every field is optional so an empty object is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiry as milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl AccessTokens {
    /// All five fields are present.
    pub fn is_complete(&self) -> bool {
        self.access_token.is_some()
            && self.refresh_token.is_some()
            && self.scope.is_some()
            && self.token_type.is_some()
            && self.expiry_date.is_some()
    }

    /// Expiry instant, if known and representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry_date
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

/// A bearer token handed to the upload transport.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.secret)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Credential availability as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    /// A usable token exists.
    Valid,
    /// No token set stored; consent required.
    Unavailable,
    /// The token expired; a refresh is in progress or pending.
    Expired,
    /// Waiting for the user to finish the browser consent.
    AwaitingConsent { url: String },
    /// The last refresh attempt failed.
    RefreshFailed { reason: String },
}

impl From<&super::CredentialError> for CredentialStatus {
    fn from(err: &super::CredentialError) -> Self {
        match err {
            super::CredentialError::Unavailable => Self::Unavailable,
            super::CredentialError::Expired(_) => Self::Expired,
            other => Self::RefreshFailed {
                reason: other.to_string(),
            },
        }
    }
}
