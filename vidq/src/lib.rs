//! vidq: watches a folder for finalized videos and uploads them to YouTube
//! one at a time, holding back while the daily upload quota is exhausted.

pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod presenter;
pub mod scheduler;
pub mod upload;
pub mod utils;

pub use error::{Error, Result};
