//! JSON configuration file and its write-back store.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::settings::{SchedulerSettings, UploadSettings};
use super::{CONFIG_PATH_ENV, ConfigError, DEFAULT_CONFIG_PATH};
use crate::credentials::AccessTokens;

/// Document key holding the persisted token set.
const ACCESS_TOKENS_KEY: &str = "accessTokens";

/// Resolve the configuration file path (`VIDQ_CONFIG` or `config.json`).
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// OAuth client as downloaded from the Google API console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uris: Vec<String>,
}

impl OAuthClient {
    /// The redirect URI used for the consent flow (the first one listed).
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uris.first().map(String::as_str)
    }
}

/// Application-level OAuth credentials (`credentials.web`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientCredentials {
    pub web: OAuthClient,
}

/// The whole configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Watched directory; immutable for the run.
    pub root_folder: PathBuf,
    pub credentials: ClientCredentials,
    /// Token set, written back after every refresh.
    #[serde(default)]
    pub access_tokens: AccessTokens,
    #[serde(default)]
    pub upload: UploadSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

impl AppConfig {
    /// Deserialize and validate a parsed document.
    fn from_document(path: &Path, document: &Value) -> Result<Self, ConfigError> {
        let config = Self::deserialize(document).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values serde cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_folder.as_os_str().is_empty() {
            return Err(ConfigError::invalid("rootFolder must not be empty"));
        }
        if self.credentials.web.client_id.is_empty() {
            return Err(ConfigError::invalid("credentials.web.client_id must not be empty"));
        }
        if self.credentials.web.redirect_uri().is_none() {
            return Err(ConfigError::invalid(
                "credentials.web.redirect_uris must list at least one URI",
            ));
        }
        self.scheduler.time_zone()?;
        Ok(())
    }
}

/// Typed view plus the raw document it was read from.
#[derive(Debug)]
struct Loaded {
    config: AppConfig,
    document: Value,
}

/// Owns the configuration file and serializes token write-backs.
///
/// Write-backs replace only `accessTokens` in the document as read, so keys
/// vidq does not model survive untouched.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    state: Mutex<Loaded>,
}

impl ConfigStore {
    /// Load the configuration file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::Missing(path.clone())
            } else {
                ConfigError::Read {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let document: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        if !document.is_object() {
            return Err(ConfigError::invalid("configuration must be a JSON object"));
        }
        let config = AppConfig::from_document(&path, &document)?;
        debug!(path = %path.display(), root = %config.root_folder.display(), "Loaded configuration");

        Ok(Self {
            path,
            state: Mutex::new(Loaded { config, document }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current configuration.
    pub fn snapshot(&self) -> AppConfig {
        self.state.lock().config.clone()
    }

    /// Replace the token set and write the document back to disk.
    pub async fn store_tokens(&self, tokens: AccessTokens) -> Result<(), ConfigError> {
        let content = {
            let mut state = self.state.lock();
            let value = serde_json::to_value(&tokens).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?;
            let Some(document) = state.document.as_object_mut() else {
                return Err(ConfigError::invalid("configuration must be a JSON object"));
            };
            document.insert(ACCESS_TOKENS_KEY.to_string(), value);
            state.config.access_tokens = tokens;
            serde_json::to_string_pretty(&state.document).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?
        };

        // Write to a sibling file first so a crash never leaves a truncated config.
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|source| ConfigError::Write {
                path: tmp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| ConfigError::Write {
                path: self.path.clone(),
                source,
            })?;

        info!(path = %self.path.display(), "Stored refreshed access tokens");
        Ok(())
    }
}
