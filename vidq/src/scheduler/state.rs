//! Scheduler state machine states.

/// Scheduler operational states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchedulerState {
    /// No active session; the queue may still hold jobs (e.g. while waiting
    /// for credentials).
    #[default]
    Idle,
    /// Exactly one upload session is active.
    Uploading,
    /// Quota exhausted; a job is held until the reset deadline.
    Suspended,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Uploading => "UPLOADING",
            Self::Suspended => "SUSPENDED",
        }
    }

    /// Validate a state transition.
    pub fn can_transition_to(&self, target: SchedulerState) -> bool {
        use SchedulerState::*;

        match (self, target) {
            (from, to) if from == &to => true,
            (Idle, Uploading) => true,
            (Uploading, Idle | Suspended) => true,
            // Retry after the reset deadline goes straight to uploading.
            (Suspended, Uploading) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
