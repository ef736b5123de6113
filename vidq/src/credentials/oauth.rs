//! Google OAuth2 endpoints: consent URL, code exchange and token refresh.

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{AccessTokens, CredentialError};
use crate::config::OAuthClient;

/// Scope required to insert videos.
pub const UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Error body of the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    /// Convert to the persisted shape; `previous_refresh` is kept when the
    /// server does not rotate the refresh token.
    fn into_tokens(self, now: DateTime<Utc>, previous_refresh: Option<String>) -> AccessTokens {
        let expires_in = self.expires_in.unwrap_or(3600);
        AccessTokens {
            access_token: Some(self.access_token),
            refresh_token: self.refresh_token.or(previous_refresh),
            scope: Some(self.scope.unwrap_or_else(|| UPLOAD_SCOPE.to_string())),
            token_type: Some(self.token_type.unwrap_or_else(|| "Bearer".to_string())),
            expiry_date: Some((now + Duration::seconds(expires_in)).timestamp_millis()),
        }
    }
}

/// Thin client over the Google OAuth2 endpoints.
#[derive(Debug, Clone)]
pub struct GoogleOAuthClient {
    client: Client,
    app: OAuthClient,
    token_url: String,
}

impl GoogleOAuthClient {
    pub fn new(client: Client, app: OAuthClient) -> Self {
        Self {
            client,
            app,
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Point token requests at another endpoint (tests, proxies).
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Redirect URI registered for the consent flow.
    pub fn redirect_uri(&self) -> Result<&str, CredentialError> {
        self.app
            .redirect_uri()
            .ok_or_else(|| CredentialError::Consent("no redirect URI configured".to_string()))
    }

    /// Consent page URL requesting offline access to the upload scope.
    pub fn authorization_url(&self) -> Result<Url, CredentialError> {
        let redirect_uri = self.redirect_uri()?;
        Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.app.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("scope", UPLOAD_SCOPE),
            ],
        )
        .map_err(|e| CredentialError::ParseError(e.to_string()))
    }

    /// Exchange an authorization code for a token set.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<AccessTokens, CredentialError> {
        let redirect_uri = self.redirect_uri()?;
        let params = [
            ("code", code),
            ("client_id", self.app.client_id.as_str()),
            ("client_secret", self.app.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        let response = self.request_token(&params).await?;
        debug!("Exchanged authorization code for tokens");
        Ok(response.into_tokens(Utc::now(), None))
    }

    /// Obtain a new access token with a refresh token.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessTokens, CredentialError> {
        let params = [
            ("refresh_token", refresh_token),
            ("client_id", self.app.client_id.as_str()),
            ("client_secret", self.app.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let response = self.request_token(&params).await?;
        debug!("Refreshed access token");
        Ok(response.into_tokens(Utc::now(), Some(refresh_token.to_string())))
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse, CredentialError> {
        let response = self.client.post(&self.token_url).form(params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(status = %status, "Token endpoint unavailable");
            return Err(CredentialError::ServerUnavailable {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => CredentialError::Rejected {
                    error: err.error,
                    description: err.error_description,
                },
                Err(_) => CredentialError::Rejected {
                    error: format!("HTTP {}", status),
                    description: Some(body),
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| CredentialError::ParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::StatusCode as HttpStatus;
    use axum::routing::post;

    use super::*;

    async fn token_endpoint(status: HttpStatus, body: &'static str) -> String {
        let router = Router::new().route("/token", post(move || async move { (status, body) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/token", addr)
    }

    fn client_for(token_url: String) -> GoogleOAuthClient {
        GoogleOAuthClient::new(crate::utils::http_client::build_client().unwrap(), app())
            .with_token_url(token_url)
    }

    fn app() -> OAuthClient {
        OAuthClient {
            client_id: "id.apps.googleusercontent.com".to_string(),
            client_secret: "secret".to_string(),
            redirect_uris: vec!["http://localhost:5000/oauth2callback".to_string()],
        }
    }

    #[test]
    fn test_authorization_url() {
        let client = GoogleOAuthClient::new(crate::utils::http_client::build_client().unwrap(), app());
        let url = client.authorization_url().unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["scope"], UPLOAD_SCOPE);
        assert_eq!(pairs["redirect_uri"], "http://localhost:5000/oauth2callback");
        assert_eq!(pairs["client_id"], "id.apps.googleusercontent.com");
    }

    #[test]
    fn test_into_tokens_keeps_previous_refresh_token() {
        let now = Utc::now();
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"ya29.new","expires_in":3599}"#).unwrap();
        let tokens = response.into_tokens(now, Some("1//old".to_string()));
        assert!(tokens.is_complete());
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//old"));
        assert_eq!(
            tokens.expiry_date,
            Some((now + Duration::seconds(3599)).timestamp_millis())
        );
    }

    #[test]
    fn test_missing_redirect_uri() {
        let mut app = app();
        app.redirect_uris.clear();
        let client = GoogleOAuthClient::new(crate::utils::http_client::build_client().unwrap(), app);
        assert!(matches!(
            client.authorization_url(),
            Err(CredentialError::Consent(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let url = token_endpoint(
            HttpStatus::OK,
            r#"{"access_token":"ya29.new","expires_in":3599,"token_type":"Bearer"}"#,
        )
        .await;
        let tokens = client_for(url).refresh("1//refresh").await.unwrap();
        assert_eq!(tokens.access_token.as_deref(), Some("ya29.new"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//refresh"));
        assert!(tokens.is_complete());
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let url = token_endpoint(
            HttpStatus::SERVICE_UNAVAILABLE,
            "<html>backend down</html>",
        )
        .await;
        let err = client_for(url).refresh("1//refresh").await.unwrap_err();
        assert!(matches!(err, CredentialError::ServerUnavailable { status: 503 }));
        assert!(err.is_transient());
        assert!(!err.requires_consent());
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let url = token_endpoint(HttpStatus::TOO_MANY_REQUESTS, "slow down").await;
        let err = client_for(url).refresh("1//refresh").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_invalid_grant_requires_consent() {
        let url = token_endpoint(
            HttpStatus::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
        )
        .await;
        let err = client_for(url).refresh("1//refresh").await.unwrap_err();
        assert!(err.requires_consent());
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_invalid_client_does_not_require_consent() {
        let url = token_endpoint(
            HttpStatus::UNAUTHORIZED,
            r#"{"error":"invalid_client","error_description":"Unauthorized"}"#,
        )
        .await;
        let err = client_for(url).refresh("1//refresh").await.unwrap_err();
        assert!(matches!(err, CredentialError::Rejected { ref error, .. } if error == "invalid_client"));
        assert!(!err.requires_consent());
    }
}
