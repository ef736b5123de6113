//! Local HTTP endpoint receiving the OAuth redirect.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::CredentialError;

type CodeSender = Arc<Mutex<Option<oneshot::Sender<Result<String, String>>>>>;

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

/// Listener bound to the redirect URI's host and port.
pub struct CallbackServer {
    listener: TcpListener,
    path: String,
}

impl CallbackServer {
    /// Bind the address named by `redirect_uri`.
    pub async fn bind(redirect_uri: &str) -> Result<Self, CredentialError> {
        let url = Url::parse(redirect_uri)
            .map_err(|e| CredentialError::Consent(format!("invalid redirect URI: {}", e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| CredentialError::Consent("redirect URI has no host".to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| CredentialError::Consent("redirect URI has no port".to_string()))?;

        let listener = TcpListener::bind((host, port)).await?;
        Ok(Self {
            listener,
            path: url.path().to_string(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the first redirect arrives and return its code.
    pub async fn wait_for_code(self) -> Result<String, CredentialError> {
        let (tx, rx) = oneshot::channel();
        let sender: CodeSender = Arc::new(Mutex::new(Some(tx)));
        let router = Router::new()
            .route(&self.path, get(handle_callback))
            .with_state(sender);

        if let Ok(addr) = self.listener.local_addr() {
            info!("Waiting for OAuth redirect on http://{}{}", addr, self.path);
        }

        let shutdown = CancellationToken::new();
        let server_shutdown = shutdown.clone();
        let server = tokio::spawn(async move {
            axum::serve(self.listener, router)
                .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
                .await
        });

        let result = rx.await;
        shutdown.cancel();
        match server.await {
            Ok(Err(e)) => warn!(error = %e, "OAuth callback server error"),
            Err(e) => warn!(error = %e, "OAuth callback server task failed"),
            Ok(Ok(())) => debug!("OAuth callback server stopped"),
        }

        match result {
            Ok(Ok(code)) => Ok(code),
            Ok(Err(error)) => Err(CredentialError::Consent(error)),
            Err(_) => Err(CredentialError::Consent(
                "callback server stopped before a redirect arrived".to_string(),
            )),
        }
    }
}

async fn handle_callback(
    State(sender): State<CodeSender>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, &'static str) {
    let (result, reply) = match (params.code, params.error) {
        (Some(code), _) => (
            Ok(code),
            (
                StatusCode::OK,
                "You can close this tab and check the console log.",
            ),
        ),
        (None, Some(error)) => (
            Err(format!("consent denied: {}", error)),
            (StatusCode::BAD_REQUEST, "Authorization was denied."),
        ),
        (None, None) => {
            return (StatusCode::BAD_REQUEST, "Missing authorization code.");
        }
    };

    if let Some(tx) = sender.lock().take() {
        let _ = tx.send(result);
    }
    reply
}
