//! Small helpers shared across modules.

pub mod browser;
pub mod format;
pub mod http_client;
