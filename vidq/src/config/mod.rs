//! Persisted configuration.
//!
//! The configuration lives in a single JSON document next to the binary
//! (`config.json` by default). It holds the watched root folder, the OAuth
//! client credentials, the access tokens written back after a refresh, and
//! optional upload/scheduler settings.

mod error;
mod file;
mod settings;

pub use error::ConfigError;
pub use file::{AppConfig, ClientCredentials, ConfigStore, OAuthClient, config_path};
pub use settings::{FailurePolicy, SchedulerSettings, UploadSettings};

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "VIDQ_CONFIG";
