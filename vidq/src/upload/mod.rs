//! Upload transport: the contract the scheduler drives and its YouTube
//! implementation.

mod error;
mod youtube;

use async_trait::async_trait;
use serde::Serialize;

pub use crate::domain::UploadOutcome;
pub use error::TransportError;
pub use youtube::YouTubeTransport;

use crate::credentials::AccessToken;
use crate::domain::{AttemptId, ProgressCounter, VideoJob};

/// Privacy status for every upload.
pub const PRIVACY_STATUS: &str = "private";

/// Descriptive metadata sent with a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub privacy_status: &'static str,
}

/// Everything the transport needs for one attempt.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub attempt: AttemptId,
    pub job: VideoJob,
    pub token: AccessToken,
    pub metadata: UploadMetadata,
    /// The transport adds every byte it hands to the network.
    pub progress: ProgressCounter,
}

/// Performs the network transfer for one attempt.
///
/// The call is long-running and has no timeout. Failures are reported as
/// outcomes, never as errors, so the scheduler always gets a terminal result.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn upload(&self, request: &UploadRequest) -> UploadOutcome;
}
