//! Credential management.
//!
//! # Architecture
//!
//! - [`AccessTokens`]: the persisted OAuth token set (`accessTokens` in the config)
//! - [`CredentialProvider`]: what the scheduler asks for a usable bearer token
//! - [`TokenStore`]: in-memory provider backed by the persisted token set
//! - [`GoogleOAuthClient`]: authorization URL, code exchange and token refresh
//! - [`CredentialRefreshService`]: orchestrates refresh, consent and write-back

mod callback;
mod error;
mod oauth;
mod provider;
mod service;
mod types;

pub use callback::CallbackServer;
pub use error::CredentialError;
pub use oauth::{GoogleOAuthClient, UPLOAD_SCOPE};
pub use provider::{CredentialProvider, TokenStore};
pub use service::{ConsentListener, CredentialRefreshService, CredentialRefresher};
pub use types::{AccessToken, AccessTokens, CredentialStatus};
