//! Upload scheduling: the state machine and the service that drives it.

pub mod clock;
mod machine;
pub mod handle;
pub mod messages;
pub mod service;
pub mod snapshot;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use machine::{Effect, REFRESH_COOLDOWN_SECS, Suspension, UploadScheduler};
pub use handle::{SchedulerHandle, SendError, channel};
pub use messages::SchedulerMessage;
pub use service::SchedulerService;
pub use snapshot::{
    ActiveUpload, FailedUpload, SchedulerSnapshot, SuspendedUpload, SuspensionCause,
};
pub use state::SchedulerState;
