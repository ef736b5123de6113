//! Messages accepted by the scheduler service.

use tokio::sync::oneshot;

use super::snapshot::SchedulerSnapshot;
use crate::domain::{AttemptId, UploadOutcome, VideoJob};

/// Everything that can happen to the scheduler from the outside.
#[derive(Debug)]
pub enum SchedulerMessage {
    /// A qualifying finalize event produced a job.
    FileFinalized(VideoJob),
    /// The transport reported a terminal outcome.
    TransferFinished {
        attempt: AttemptId,
        outcome: UploadOutcome,
    },
    /// The refresh flow installed new tokens.
    CredentialsRefreshed,
    /// The refresh flow failed.
    CredentialRefreshFailed(String),
    /// The refresh flow needs browser consent at this URL.
    ConsentRequired(String),
    /// Request a snapshot of the current state.
    GetSnapshot(oneshot::Sender<SchedulerSnapshot>),
    /// Stop the service loop.
    Stop,
}

impl SchedulerMessage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FileFinalized(_) => "file_finalized",
            Self::TransferFinished { .. } => "transfer_finished",
            Self::CredentialsRefreshed => "credentials_refreshed",
            Self::CredentialRefreshFailed(_) => "credential_refresh_failed",
            Self::ConsentRequired(_) => "consent_required",
            Self::GetSnapshot(_) => "get_snapshot",
            Self::Stop => "stop",
        }
    }
}
