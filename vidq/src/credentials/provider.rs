//! Credential provider trait and the token store implementing it.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::debug;

use super::{AccessToken, AccessTokens, CredentialError};

/// Tokens this close to expiry are already treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Supplies bearer tokens to the scheduler.
///
/// Refreshing happens out of band; the provider only reports whether a usable
/// token exists right now.
pub trait CredentialProvider: Send + Sync {
    /// A usable token, or why there is none.
    fn token(&self, now: DateTime<Utc>) -> Result<AccessToken, CredentialError>;

    /// Whether `token` is no longer usable at `now`.
    fn is_expired(&self, token: &AccessToken, now: DateTime<Utc>) -> bool {
        token.expires_at - Duration::seconds(EXPIRY_SKEW_SECS) <= now
    }
}

/// In-memory token set, seeded from the configuration file.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<AccessTokens>,
}

impl TokenStore {
    pub fn new(tokens: AccessTokens) -> Self {
        Self {
            tokens: RwLock::new(tokens),
        }
    }

    /// Current token set.
    pub fn tokens(&self) -> AccessTokens {
        self.tokens.read().clone()
    }

    /// Install a freshly issued token set.
    pub fn replace(&self, tokens: AccessTokens) {
        debug!(expires_at = ?tokens.expires_at(), "Token store updated");
        *self.tokens.write() = tokens;
    }
}

impl CredentialProvider for TokenStore {
    fn token(&self, now: DateTime<Utc>) -> Result<AccessToken, CredentialError> {
        let tokens = self.tokens.read();
        if !tokens.is_complete() {
            return Err(CredentialError::Unavailable);
        }
        let (Some(secret), Some(expires_at)) = (tokens.access_token.as_ref(), tokens.expires_at())
        else {
            return Err(CredentialError::Unavailable);
        };

        let token = AccessToken::new(secret.clone(), expires_at);
        if self.is_expired(&token, now) {
            return Err(CredentialError::Expired(expires_at));
        }
        Ok(token)
    }
}
