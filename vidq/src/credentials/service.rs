//! Credential refresh service.
//!
//! Orchestrates token refresh, the browser consent fallback and persistence
//! of the new token set.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};
use url::Url;

use super::{AccessTokens, CallbackServer, CredentialError, GoogleOAuthClient, TokenStore};
use crate::config::ConfigStore;
use crate::utils::browser;

/// Out-of-band refresh flow triggered by the scheduler.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    /// Obtain a usable token set; returns once the provider can hand out tokens.
    async fn refresh(&self) -> Result<(), CredentialError>;
}

/// Called with the consent URL when the browser flow starts.
pub type ConsentListener = Box<dyn Fn(&Url) + Send + Sync>;

/// Refreshes Google OAuth tokens and writes them back to the config file.
pub struct CredentialRefreshService {
    oauth: GoogleOAuthClient,
    store: Arc<TokenStore>,
    config: Arc<ConfigStore>,
    open_browser: bool,
    consent_listener: Option<ConsentListener>,
}

impl CredentialRefreshService {
    pub fn new(oauth: GoogleOAuthClient, store: Arc<TokenStore>, config: Arc<ConfigStore>) -> Self {
        Self {
            oauth,
            store,
            config,
            open_browser: true,
            consent_listener: None,
        }
    }

    /// Report consent URLs to `listener` (the dashboard shows them).
    pub fn with_consent_listener(mut self, listener: ConsentListener) -> Self {
        self.consent_listener = Some(listener);
        self
    }

    /// Only report the consent URL instead of launching a browser.
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    /// Try the refresh-token grant.
    async fn refresh_with_token(&self, refresh_token: &str) -> Result<AccessTokens, CredentialError> {
        self.oauth.refresh(refresh_token).await
    }

    /// Run the browser consent flow and exchange the resulting code.
    #[instrument(skip(self))]
    async fn consent(&self) -> Result<AccessTokens, CredentialError> {
        let url = self.oauth.authorization_url()?;
        let redirect_uri = self.oauth.redirect_uri()?.to_string();

        // Bind before showing the URL so the redirect cannot race the listener.
        let server = CallbackServer::bind(&redirect_uri).await?;

        info!(url = %url, "Authorization required; complete the consent in your browser");
        if let Some(listener) = &self.consent_listener {
            listener(&url);
        }
        if self.open_browser {
            if let Err(e) = browser::open(url.as_str()) {
                warn!(error = %e, "Failed to launch browser; open the URL manually");
            }
        }

        let code = server.wait_for_code().await?;
        self.oauth.exchange_code(&code).await
    }

    async fn install(&self, tokens: AccessTokens) -> Result<(), CredentialError> {
        self.store.replace(tokens.clone());
        self.config.store_tokens(tokens).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialRefresher for CredentialRefreshService {
    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<(), CredentialError> {
        let current = self.store.tokens();

        if let Some(refresh_token) = current.refresh_token.as_deref() {
            match self.refresh_with_token(refresh_token).await {
                Ok(tokens) => {
                    info!("Access token refreshed");
                    return self.install(tokens).await;
                }
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "Token refresh failed with a transient error");
                    return Err(e);
                }
                Err(e) if e.requires_consent() => {
                    warn!(error = %e, "Refresh token rejected; falling back to consent");
                }
                Err(e) => return Err(e),
            }
        }

        let tokens = self.consent().await?;
        info!("Authorization complete");
        self.install(tokens).await
    }
}
