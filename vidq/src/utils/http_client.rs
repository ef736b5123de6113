use std::{sync::OnceLock, time::Duration};

use tracing::debug;

/// Connect timeout for API and upload requests. Transfers themselves have no
/// overall timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate may have installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the client shared by the OAuth flow and the upload transport.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    install_rustls_provider();

    reqwest::Client::builder()
        .user_agent(concat!("vidq/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
}
