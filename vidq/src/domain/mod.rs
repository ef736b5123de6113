//! Domain layer: jobs, the pending queue, upload sessions and the quota clock.

pub mod job;
pub mod queue;
pub mod quota;
pub mod session;

pub use job::VideoJob;
pub use queue::VideoQueue;
pub use quota::QuotaClock;
pub use session::{AttemptId, FinishedSession, ProgressCounter, UploadOutcome, UploadSession};
