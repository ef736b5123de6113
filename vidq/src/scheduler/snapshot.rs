//! Read-only views of scheduler state for the presenter.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::SchedulerState;
use crate::credentials::CredentialStatus;

/// Why a job is held in the suspension slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuspensionCause {
    QuotaExhausted,
    /// Non-quota failure held under the `suspend` failure policy.
    TransferFailed(String),
}

/// An upload that failed and was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpload {
    /// Root-relative path.
    pub path: String,
    pub reason: String,
}

/// The in-flight transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveUpload {
    pub file_name: String,
    pub bytes_dispatched: u64,
    pub total_bytes: u64,
    pub percent: Option<f64>,
    /// Bytes per tick.
    pub throughput: u64,
}

/// The held job and its deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct SuspendedUpload {
    /// Root-relative path.
    pub path: String,
    pub deadline: DateTime<Utc>,
    pub remaining: Duration,
    /// Zone whose midnight is the deadline.
    pub time_zone: Tz,
    pub cause: SuspensionCause,
}

/// Everything the dashboard renders.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSnapshot {
    pub taken_at: DateTime<Utc>,
    pub state: SchedulerState,
    pub root: PathBuf,
    pub completed: Vec<String>,
    pub failed: Vec<FailedUpload>,
    pub active: Option<ActiveUpload>,
    pub suspended: Option<SuspendedUpload>,
    /// Root-relative paths, head first.
    pub queued: Vec<String>,
    pub credentials: CredentialStatus,
}
