//! Upload session: bookkeeping for one in-flight transfer attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::VideoJob;

/// Identifies one transfer attempt; completions for other attempts are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub u64);

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bytes dispatched by the transport, shared with the session.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter(Arc<AtomicU64>);

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `bytes` more bytes handed to the network.
    pub fn add(&self, bytes: u64) {
        self.0.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of one transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Succeeded,
    /// The daily quota is exhausted.
    FailedQuota,
    /// Any other failure.
    FailedOther(String),
}

impl UploadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::FailedQuota => "failed_quota",
            Self::FailedOther(_) => "failed_other",
        }
    }
}

/// A session that ended, handing its job back.
#[derive(Debug)]
pub struct FinishedSession {
    pub job: VideoJob,
    pub outcome: UploadOutcome,
    pub bytes_dispatched: u64,
}

/// Tracks one active transfer.
#[derive(Debug)]
pub struct UploadSession {
    attempt: AttemptId,
    job: VideoJob,
    total_bytes: u64,
    bytes_dispatched: u64,
    throughput: u64,
    progress: ProgressCounter,
}

impl UploadSession {
    /// Begin tracking with `bytes_dispatched = 0`.
    pub fn start(attempt: AttemptId, job: VideoJob, total_bytes: u64) -> Self {
        Self {
            attempt,
            job,
            total_bytes,
            bytes_dispatched: 0,
            throughput: 0,
            progress: ProgressCounter::new(),
        }
    }

    /// Sample the byte count; throughput is the delta since the previous sample.
    pub fn observe(&mut self, bytes_dispatched_now: u64) {
        let bytes = bytes_dispatched_now.max(self.bytes_dispatched);
        self.throughput = bytes - self.bytes_dispatched;
        self.bytes_dispatched = bytes;
    }

    /// Sample the shared progress counter.
    pub fn observe_progress(&mut self) {
        let bytes = self.progress.get();
        self.observe(bytes);
    }

    /// Percentage in `[0, 100]`, or `None` when the size is unknown.
    pub fn percent_complete(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        let percent = self.bytes_dispatched as f64 / self.total_bytes as f64 * 100.0;
        Some(percent.clamp(0.0, 100.0))
    }

    /// End the session with `outcome`.
    pub fn finish(self, outcome: UploadOutcome) -> FinishedSession {
        FinishedSession {
            job: self.job,
            outcome,
            bytes_dispatched: self.progress.get().max(self.bytes_dispatched),
        }
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn job(&self) -> &VideoJob {
        &self.job
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn bytes_dispatched(&self) -> u64 {
        self.bytes_dispatched
    }

    /// Bytes per observation tick.
    pub fn throughput(&self) -> u64 {
        self.throughput
    }

    /// Counter the transport writes into.
    pub fn progress(&self) -> ProgressCounter {
        self.progress.clone()
    }
}
