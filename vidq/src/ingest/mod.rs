//! Event ingestion: turns file system notifications into queued jobs.

mod watcher;

use std::ffi::OsString;
use std::path::PathBuf;

use tracing::{debug, trace};

pub use watcher::FsWatcher;

use crate::domain::VideoJob;
use crate::scheduler::{SchedulerHandle, SchedulerMessage, SendError};

/// A file system notification as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    /// A file was renamed into its final name.
    Finalized { directory: PathBuf, file: OsString },
    /// Anything else.
    Other,
}

impl FsEvent {
    pub fn finalized(directory: impl Into<PathBuf>, file: impl Into<OsString>) -> Self {
        Self::Finalized {
            directory: directory.into(),
            file: file.into(),
        }
    }
}

/// Filters events and forwards qualifying videos to the scheduler.
#[derive(Debug, Clone)]
pub struct EventIngestor {
    handle: SchedulerHandle,
}

impl EventIngestor {
    pub fn new(handle: SchedulerHandle) -> Self {
        Self { handle }
    }

    /// The job for `event`, if it finalizes a video.
    ///
    /// A video qualifies when its base name matches the directory it lives
    /// in, e.g. `talks/intro/intro.mp4`.
    pub fn qualify(event: &FsEvent) -> Option<VideoJob> {
        let FsEvent::Finalized { directory, file } = event else {
            return None;
        };
        let folder = directory.file_name()?;
        let path = directory.join(file);
        let stem = path.file_stem()?;
        if folder != stem {
            trace!(path = %path.display(), "Finalized file does not match its folder");
            return None;
        }
        Some(VideoJob::new(path))
    }

    /// Forward `event` from async code; returns whether it was queued.
    pub async fn ingest(&self, event: FsEvent) -> Result<bool, SendError> {
        match Self::qualify(&event) {
            Some(job) => {
                debug!(path = %job.path().display(), "Finalized video detected");
                self.handle
                    .deliver(SchedulerMessage::FileFinalized(job))
                    .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Forward `event` from a thread outside the runtime.
    pub fn ingest_blocking(&self, event: FsEvent) -> Result<bool, SendError> {
        match Self::qualify(&event) {
            Some(job) => {
                debug!(path = %job.path().display(), "Finalized video detected");
                self.handle
                    .blocking_send(SchedulerMessage::FileFinalized(job))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
