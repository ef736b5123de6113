//! The upload scheduler state machine.
//!
//! The scheduler is synchronous and owns all mutable state: the pending queue,
//! the active session and the suspension slot. Every transition takes the
//! current instant and returns at most one [`Effect`] for the runtime to
//! execute, so tests can drive it without timers or a network.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::SchedulerState;
use super::snapshot::{
    ActiveUpload, FailedUpload, SchedulerSnapshot, SuspendedUpload, SuspensionCause,
};
use crate::config::{FailurePolicy, UploadSettings};
use crate::credentials::{AccessToken, CredentialError, CredentialProvider, CredentialStatus};
use crate::domain::{AttemptId, QuotaClock, UploadOutcome, UploadSession, VideoJob, VideoQueue};
use crate::upload::{PRIVACY_STATUS, UploadMetadata, UploadRequest};

/// Delay before a failed credential refresh is attempted again.
pub const REFRESH_COOLDOWN_SECS: i64 = 30;

/// Work the runtime performs on behalf of the scheduler.
#[derive(Debug)]
pub enum Effect {
    /// Hand the request to the upload transport.
    StartUpload(UploadRequest),
    /// Run the credential refresh flow.
    RefreshCredentials(CredentialStatus),
}

/// A job held until the quota resets.
#[derive(Debug, Clone)]
pub struct Suspension {
    pub job: VideoJob,
    pub deadline: DateTime<Utc>,
    pub cause: SuspensionCause,
}

#[derive(Debug)]
struct CredentialWait {
    status: CredentialStatus,
    refresh_in_flight: bool,
    retry_at: Option<DateTime<Utc>>,
}

impl CredentialWait {
    fn new(status: CredentialStatus) -> Self {
        Self {
            status,
            refresh_in_flight: false,
            retry_at: None,
        }
    }
}

/// Serializes uploads and gates them on credentials and quota.
pub struct UploadScheduler {
    root: PathBuf,
    credentials: Arc<dyn CredentialProvider>,
    quota_clock: QuotaClock,
    failure_policy: FailurePolicy,
    upload: UploadSettings,
    queue: VideoQueue,
    session: Option<UploadSession>,
    suspension: Option<Suspension>,
    credential_wait: Option<CredentialWait>,
    completed: Vec<String>,
    failed: Vec<FailedUpload>,
    next_attempt: u64,
}

impl UploadScheduler {
    pub fn new(root: impl Into<PathBuf>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            root: root.into(),
            credentials,
            quota_clock: QuotaClock::default(),
            failure_policy: FailurePolicy::default(),
            upload: UploadSettings::default(),
            queue: VideoQueue::new(),
            session: None,
            suspension: None,
            credential_wait: None,
            completed: Vec::new(),
            failed: Vec::new(),
            next_attempt: 1,
        }
    }

    pub fn with_quota_clock(mut self, quota_clock: QuotaClock) -> Self {
        self.quota_clock = quota_clock;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_upload_settings(mut self, upload: UploadSettings) -> Self {
        self.upload = upload;
        self
    }

    /// Current state, derived from the session and suspension slots.
    pub fn state(&self) -> SchedulerState {
        if self.session.is_some() {
            SchedulerState::Uploading
        } else if self.suspension.is_some() {
            SchedulerState::Suspended
        } else {
            SchedulerState::Idle
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn queue(&self) -> &VideoQueue {
        &self.queue
    }

    pub fn session(&self) -> Option<&UploadSession> {
        self.session.as_ref()
    }

    pub fn suspension(&self) -> Option<&Suspension> {
        self.suspension.as_ref()
    }

    /// Root-relative paths of uploaded videos, oldest first.
    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    pub fn failed(&self) -> &[FailedUpload] {
        &self.failed
    }

    /// Append a finalized video and start it if nothing else is running.
    pub fn enqueue(&mut self, job: VideoJob, now: DateTime<Utc>) -> Option<Effect> {
        info!(
            path = %job.path().display(),
            title = %job.title(),
            queued = self.queue.len() + 1,
            "Video queued"
        );
        self.queue.enqueue(job);
        self.try_start(now)
    }

    /// Start the next upload if one is allowed at `now`.
    ///
    /// A suspended job is retried ahead of the queue once its deadline has
    /// passed. Credentials are checked before a job is taken so a missing
    /// token leaves the job where it was.
    pub fn try_start(&mut self, now: DateTime<Utc>) -> Option<Effect> {
        if self.session.is_some() {
            return None;
        }

        let token = match self.usable_token(now) {
            Ok(token) => token,
            Err(err) => return self.wait_for_credentials(&err, now),
        };
        self.credential_wait = None;

        if let Some(suspension) = &self.suspension {
            if now < suspension.deadline {
                return None;
            }
        }

        let from = self.state();
        let job = match self.suspension.take() {
            Some(suspension) => {
                info!(
                    path = %suspension.job.path().display(),
                    deadline = %suspension.deadline,
                    "Reset deadline reached, retrying suspended upload"
                );
                suspension.job
            }
            None => self.queue.dequeue()?,
        };

        let total_bytes = match job.file_size() {
            Ok(size) => size,
            Err(e) => {
                warn!(path = %job.path().display(), error = %e, "Could not read file size");
                0
            }
        };

        let attempt = AttemptId(self.next_attempt);
        self.next_attempt += 1;

        let metadata = UploadMetadata {
            title: self.upload.render_title(job.title()),
            description: self.upload.description.clone(),
            tags: self.upload.tags_for(job.title()),
            privacy_status: PRIVACY_STATUS,
        };
        let session = UploadSession::start(attempt, job.clone(), total_bytes);
        let progress = session.progress();
        self.session = Some(session);
        self.log_transition(from);

        info!(
            attempt = %attempt,
            path = %job.path().display(),
            total_bytes,
            "Upload started"
        );

        Some(Effect::StartUpload(UploadRequest {
            attempt,
            job,
            token,
            metadata,
            progress,
        }))
    }

    /// Periodic tick: sample progress, or retry starting work.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Effect> {
        match self.session.as_mut() {
            Some(session) => {
                session.observe_progress();
                None
            }
            None => self.try_start(now),
        }
    }

    /// Apply the terminal outcome of a transfer attempt.
    pub fn on_transfer_finished(
        &mut self,
        attempt: AttemptId,
        outcome: UploadOutcome,
        now: DateTime<Utc>,
    ) -> Option<Effect> {
        if self.session.as_ref().map(UploadSession::attempt) != Some(attempt) {
            warn!(
                attempt = %attempt,
                outcome = outcome.as_str(),
                "Ignoring completion for an attempt that is not active"
            );
            return None;
        }
        let session = self.session.take()?;
        let finished = session.finish(outcome);
        let path = finished.job.relative_to(&self.root);

        match finished.outcome {
            UploadOutcome::Succeeded => {
                info!(
                    attempt = %attempt,
                    path = %path,
                    bytes = finished.bytes_dispatched,
                    "Upload succeeded"
                );
                self.completed.push(path);
                self.log_transition(SchedulerState::Uploading);
                self.try_start(now)
            }
            UploadOutcome::FailedQuota => {
                self.suspend(finished.job, SuspensionCause::QuotaExhausted, now);
                None
            }
            UploadOutcome::FailedOther(reason) => match self.failure_policy {
                FailurePolicy::Suspend => {
                    self.suspend(finished.job, SuspensionCause::TransferFailed(reason), now);
                    None
                }
                FailurePolicy::Drop => {
                    warn!(attempt = %attempt, path = %path, reason = %reason, "Upload failed, dropping");
                    self.failed.push(FailedUpload { path, reason });
                    self.log_transition(SchedulerState::Uploading);
                    self.try_start(now)
                }
            },
        }
    }

    /// New credentials are in place.
    ///
    /// A refresh that still leaves no usable token is treated like a failed
    /// one, so the next attempt waits out the cooldown.
    pub fn on_credentials_refreshed(&mut self, now: DateTime<Utc>) -> Option<Effect> {
        if let Err(err) = self.usable_token(now) {
            self.on_credential_refresh_failed(format!("refreshed token is not usable: {err}"), now);
            return None;
        }
        info!("Credentials refreshed");
        self.credential_wait = None;
        self.try_start(now)
    }

    /// The refresh flow failed; re-arm it after the cooldown.
    pub fn on_credential_refresh_failed(&mut self, reason: String, now: DateTime<Utc>) {
        let retry_at = now + Duration::seconds(REFRESH_COOLDOWN_SECS);
        warn!(reason = %reason, retry_at = %retry_at, "Credential refresh failed");
        let wait = self
            .credential_wait
            .get_or_insert_with(|| CredentialWait::new(CredentialStatus::Unavailable));
        wait.refresh_in_flight = false;
        wait.retry_at = Some(retry_at);
        wait.status = CredentialStatus::RefreshFailed { reason };
    }

    /// The refresh flow is waiting for the user in the browser.
    pub fn on_consent_required(&mut self, url: String) {
        let wait = self.credential_wait.get_or_insert_with(|| {
            let mut wait = CredentialWait::new(CredentialStatus::Unavailable);
            wait.refresh_in_flight = true;
            wait
        });
        wait.status = CredentialStatus::AwaitingConsent { url };
    }

    /// Read-only view for presentation.
    pub fn snapshot(&self, now: DateTime<Utc>) -> SchedulerSnapshot {
        let active = self.session.as_ref().map(|session| ActiveUpload {
            file_name: session.job().file_name(),
            bytes_dispatched: session.bytes_dispatched(),
            total_bytes: session.total_bytes(),
            percent: session.percent_complete(),
            throughput: session.throughput(),
        });

        let suspended = self.suspension.as_ref().map(|suspension| SuspendedUpload {
            path: suspension.job.relative_to(&self.root),
            deadline: suspension.deadline,
            remaining: (suspension.deadline - now).to_std().unwrap_or_default(),
            time_zone: self.quota_clock.time_zone(),
            cause: suspension.cause.clone(),
        });

        let credentials = match &self.credential_wait {
            Some(wait) => wait.status.clone(),
            None => match self.usable_token(now) {
                Ok(_) => CredentialStatus::Valid,
                Err(err) => CredentialStatus::from(&err),
            },
        };

        SchedulerSnapshot {
            taken_at: now,
            state: self.state(),
            root: self.root.clone(),
            completed: self.completed.clone(),
            failed: self.failed.clone(),
            active,
            suspended,
            queued: self
                .queue
                .iter()
                .map(|job| job.relative_to(&self.root))
                .collect(),
            credentials,
        }
    }

    fn usable_token(&self, now: DateTime<Utc>) -> Result<AccessToken, CredentialError> {
        let token = self.credentials.token(now)?;
        if self.credentials.is_expired(&token, now) {
            return Err(CredentialError::Expired(token.expires_at));
        }
        Ok(token)
    }

    fn wait_for_credentials(
        &mut self,
        err: &CredentialError,
        now: DateTime<Utc>,
    ) -> Option<Effect> {
        let wait = self
            .credential_wait
            .get_or_insert_with(|| CredentialWait::new(CredentialStatus::from(err)));

        if wait.refresh_in_flight {
            return None;
        }
        if let Some(retry_at) = wait.retry_at {
            if now < retry_at {
                return None;
            }
        }

        wait.status = CredentialStatus::from(err);
        wait.refresh_in_flight = true;
        wait.retry_at = None;
        info!(reason = %err, "No usable access token, requesting credentials");
        Some(Effect::RefreshCredentials(wait.status.clone()))
    }

    fn suspend(&mut self, job: VideoJob, cause: SuspensionCause, now: DateTime<Utc>) {
        let deadline = self.quota_clock.next_reset(now);
        match &cause {
            SuspensionCause::QuotaExhausted => {
                warn!(path = %job.path().display(), deadline = %deadline, "Upload quota exhausted, suspending");
            }
            SuspensionCause::TransferFailed(reason) => {
                warn!(
                    path = %job.path().display(),
                    deadline = %deadline,
                    reason = %reason,
                    "Upload failed, suspending until the next reset"
                );
            }
        }
        self.suspension = Some(Suspension {
            job,
            deadline,
            cause,
        });
        self.log_transition(SchedulerState::Uploading);
    }

    fn log_transition(&self, from: SchedulerState) {
        let to = self.state();
        if from == to {
            return;
        }
        if from.can_transition_to(to) {
            debug!(from = %from, to = %to, "Scheduler state changed");
        } else {
            warn!(from = %from, to = %to, "Unexpected scheduler state change");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use proptest::prelude::*;

    /// Hands out a token that is valid until `expires_at`, or nothing.
    struct StubCredentials {
        expires_at: Mutex<Option<DateTime<Utc>>>,
    }

    impl StubCredentials {
        fn valid() -> Arc<Self> {
            Arc::new(Self {
                expires_at: Mutex::new(Some(DateTime::<Utc>::MAX_UTC)),
            })
        }

        fn missing() -> Arc<Self> {
            Arc::new(Self {
                expires_at: Mutex::new(None),
            })
        }

        fn set(&self, expires_at: Option<DateTime<Utc>>) {
            *self.expires_at.lock() = expires_at;
        }
    }

    impl CredentialProvider for StubCredentials {
        fn token(&self, _now: DateTime<Utc>) -> Result<AccessToken, CredentialError> {
            match *self.expires_at.lock() {
                Some(expires_at) => Ok(AccessToken::new("token", expires_at)),
                None => Err(CredentialError::Unavailable),
            }
        }
    }

    fn pacific(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        chrono_tz::America::Los_Angeles
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn scheduler(credentials: Arc<StubCredentials>) -> UploadScheduler {
        UploadScheduler::new("/videos", credentials)
    }

    fn job(name: &str) -> VideoJob {
        VideoJob::new(format!("/videos/{name}/{name}.mp4"))
    }

    fn started(effect: Option<Effect>) -> UploadRequest {
        match effect {
            Some(Effect::StartUpload(request)) => request,
            other => panic!("expected StartUpload, got {other:?}"),
        }
    }

    #[test]
    fn test_enqueue_starts_upload_when_idle() {
        let mut s = scheduler(StubCredentials::valid());
        let now = Utc::now();
        let request = started(s.enqueue(job("a"), now));

        assert_eq!(request.job.title(), "a");
        assert_eq!(request.metadata.title, "a");
        assert_eq!(request.metadata.tags, vec!["a".to_string()]);
        assert_eq!(request.metadata.privacy_status, "private");
        assert_eq!(s.state(), SchedulerState::Uploading);
        assert!(s.queue().is_empty());
    }

    #[test]
    fn test_single_flight() {
        let mut s = scheduler(StubCredentials::valid());
        let now = Utc::now();
        started(s.enqueue(job("a"), now));
        assert!(s.enqueue(job("b"), now).is_none());
        assert!(s.tick(now).is_none());
        assert_eq!(s.queue().len(), 1);
    }

    #[test]
    fn test_success_starts_next_in_order() {
        let mut s = scheduler(StubCredentials::valid());
        let now = Utc::now();
        let first = started(s.enqueue(job("a"), now));
        s.enqueue(job("b"), now);

        let second = started(s.on_transfer_finished(first.attempt, UploadOutcome::Succeeded, now));
        assert_eq!(second.job.title(), "b");
        assert_eq!(s.completed(), ["a/a.mp4".to_string()]);
    }

    #[test]
    fn test_stale_completion_ignored() {
        let mut s = scheduler(StubCredentials::valid());
        let now = Utc::now();
        let request = started(s.enqueue(job("a"), now));

        assert!(
            s.on_transfer_finished(AttemptId(request.attempt.0 + 1), UploadOutcome::Succeeded, now)
                .is_none()
        );
        assert_eq!(s.state(), SchedulerState::Uploading);
        assert!(s.completed().is_empty());
    }

    #[test]
    fn test_quota_suspends_until_pacific_midnight() {
        let mut s = scheduler(StubCredentials::valid());
        let t0 = pacific(2024, 6, 1, 23, 50);

        let a = started(s.enqueue(job("a"), t0));
        s.enqueue(job("b"), t0);
        assert!(
            s.on_transfer_finished(a.attempt, UploadOutcome::FailedQuota, t0)
                .is_none()
        );

        assert_eq!(s.state(), SchedulerState::Suspended);
        let suspension = s.suspension().unwrap();
        assert_eq!(suspension.deadline, pacific(2024, 6, 2, 0, 0));
        assert_eq!(suspension.cause, SuspensionCause::QuotaExhausted);
        assert_eq!(s.queue().len(), 1);

        let snapshot = s.snapshot(t0);
        assert_eq!(
            snapshot.suspended.unwrap().remaining,
            std::time::Duration::from_secs(600)
        );
        assert_eq!(snapshot.queued, vec!["b/b.mp4".to_string()]);

        // Nothing starts before the deadline, even when new work arrives.
        assert!(s.tick(pacific(2024, 6, 1, 23, 59)).is_none());
        assert!(s.enqueue(job("c"), pacific(2024, 6, 1, 23, 59)).is_none());

        let retry = started(s.tick(pacific(2024, 6, 2, 0, 0)));
        assert_eq!(retry.job.title(), "a");
        assert_eq!(s.queue().len(), 2);

        let b = started(s.on_transfer_finished(
            retry.attempt,
            UploadOutcome::Succeeded,
            pacific(2024, 6, 2, 0, 5),
        ));
        assert_eq!(b.job.title(), "b");
    }

    #[test]
    fn test_failure_policy_suspend_is_default() {
        let mut s = scheduler(StubCredentials::valid());
        let now = pacific(2024, 1, 15, 12, 0);
        let a = started(s.enqueue(job("a"), now));
        s.on_transfer_finished(a.attempt, UploadOutcome::FailedOther("boom".into()), now);

        let suspension = s.suspension().unwrap();
        assert_eq!(
            suspension.cause,
            SuspensionCause::TransferFailed("boom".into())
        );
        assert_eq!(suspension.deadline, pacific(2024, 1, 16, 0, 0));
    }

    #[test]
    fn test_failure_policy_drop_moves_on() {
        let mut s = scheduler(StubCredentials::valid()).with_failure_policy(FailurePolicy::Drop);
        let now = Utc::now();
        let a = started(s.enqueue(job("a"), now));
        s.enqueue(job("b"), now);

        let b = started(s.on_transfer_finished(
            a.attempt,
            UploadOutcome::FailedOther("bad request".into()),
            now,
        ));
        assert_eq!(b.job.title(), "b");
        assert_eq!(s.failed().len(), 1);
        assert_eq!(s.failed()[0].path, "a/a.mp4");
        assert_eq!(s.failed()[0].reason, "bad request");
    }

    #[test]
    fn test_missing_credentials_keep_job_queued() {
        let credentials = StubCredentials::missing();
        let mut s = scheduler(credentials.clone());
        let now = Utc::now();

        match s.enqueue(job("a"), now) {
            Some(Effect::RefreshCredentials(status)) => {
                assert_eq!(status, CredentialStatus::Unavailable)
            }
            other => panic!("expected RefreshCredentials, got {other:?}"),
        }
        assert_eq!(s.state(), SchedulerState::Idle);
        assert_eq!(s.queue().len(), 1);

        // Only one refresh per wait.
        assert!(s.tick(now).is_none());
        assert!(s.enqueue(job("b"), now).is_none());

        s.on_consent_required("https://accounts.google.com/o/oauth2/v2/auth".into());
        assert!(matches!(
            s.snapshot(now).credentials,
            CredentialStatus::AwaitingConsent { .. }
        ));

        credentials.set(Some(DateTime::<Utc>::MAX_UTC));
        let request = started(s.on_credentials_refreshed(now));
        assert_eq!(request.job.title(), "a");
        assert_eq!(s.snapshot(now).credentials, CredentialStatus::Valid);
    }

    #[test]
    fn test_expired_token_is_not_used() {
        let credentials = StubCredentials::valid();
        let now = Utc::now();
        credentials.set(Some(now - Duration::minutes(5)));
        let mut s = scheduler(credentials);

        assert!(matches!(
            s.enqueue(job("a"), now),
            Some(Effect::RefreshCredentials(CredentialStatus::Expired))
        ));
        assert_eq!(s.queue().len(), 1);
    }

    #[test]
    fn test_refresh_failure_rearms_after_cooldown() {
        let mut s = scheduler(StubCredentials::missing());
        let now = Utc::now();
        assert!(s.enqueue(job("a"), now).is_some());

        s.on_credential_refresh_failed("network down".into(), now);
        assert_eq!(
            s.snapshot(now).credentials,
            CredentialStatus::RefreshFailed {
                reason: "network down".into()
            }
        );
        assert!(s.tick(now + Duration::seconds(10)).is_none());
        assert!(matches!(
            s.tick(now + Duration::seconds(REFRESH_COOLDOWN_SECS)),
            Some(Effect::RefreshCredentials(_))
        ));
    }

    #[test]
    fn test_unusable_refreshed_token_waits_for_cooldown() {
        let credentials = StubCredentials::missing();
        let mut s = scheduler(credentials.clone());
        let now = Utc::now();
        assert!(matches!(
            s.enqueue(job("a"), now),
            Some(Effect::RefreshCredentials(_))
        ));

        // Issued token expires inside the skew window.
        credentials.set(Some(now + Duration::seconds(30)));
        assert!(s.on_credentials_refreshed(now).is_none());
        assert!(matches!(
            s.snapshot(now).credentials,
            CredentialStatus::RefreshFailed { .. }
        ));
        assert!(s.tick(now + Duration::seconds(1)).is_none());
        assert!(s.tick(now + Duration::seconds(REFRESH_COOLDOWN_SECS - 1)).is_none());
        assert!(matches!(
            s.tick(now + Duration::seconds(REFRESH_COOLDOWN_SECS)),
            Some(Effect::RefreshCredentials(_))
        ));
        assert_eq!(s.queue().len(), 1);
    }

    #[test]
    fn test_drain_returns_to_idle() {
        let mut s = scheduler(StubCredentials::valid());
        let now = Utc::now();
        let names = ["a", "b", "c", "d"];

        let mut effect = None;
        for name in names {
            let e = s.enqueue(job(name), now);
            effect = effect.or(e);
        }
        let mut uploaded = Vec::new();
        while let Some(Effect::StartUpload(request)) = effect {
            uploaded.push(request.job.title().to_string());
            effect = s.on_transfer_finished(request.attempt, UploadOutcome::Succeeded, now);
        }

        assert_eq!(uploaded, names);
        assert_eq!(s.state(), SchedulerState::Idle);
        assert!(s.queue().is_empty());
        assert_eq!(s.completed().len(), names.len());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Enqueue,
        Tick,
        Succeed,
        Quota,
        AdvanceHours(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Enqueue),
            2 => Just(Op::Tick),
            3 => Just(Op::Succeed),
            1 => Just(Op::Quota),
            1 => (1u8..30).prop_map(Op::AdvanceHours),
        ]
    }

    proptest! {
        #[test]
        fn prop_uploads_follow_arrival_order(ops in prop::collection::vec(op(), 1..80)) {
            let mut s = scheduler(StubCredentials::valid());
            let mut now = pacific(2024, 3, 9, 20, 0);
            let mut next_id = 0usize;
            let mut active: Option<UploadRequest> = None;
            let mut held: Option<String> = None;
            let mut started_titles = Vec::new();

            for op in ops {
                let effect = match op {
                    Op::Enqueue => {
                        next_id += 1;
                        s.enqueue(job(&format!("v{next_id:03}")), now)
                    }
                    Op::Tick => s.tick(now),
                    Op::Succeed => match active.take() {
                        Some(r) => s.on_transfer_finished(r.attempt, UploadOutcome::Succeeded, now),
                        None => None,
                    },
                    Op::Quota => match active.take() {
                        Some(r) => {
                            held = Some(r.job.title().to_string());
                            s.on_transfer_finished(r.attempt, UploadOutcome::FailedQuota, now)
                        }
                        None => None,
                    },
                    Op::AdvanceHours(h) => {
                        now += Duration::hours(i64::from(h));
                        None
                    }
                };

                if let Some(Effect::StartUpload(request)) = effect {
                    // Single flight: a start only happens with nothing active.
                    prop_assert!(active.is_none());
                    let title = request.job.title().to_string();
                    match held.take() {
                        // The suspended job is retried before anything else.
                        Some(retry) => prop_assert_eq!(&title, &retry),
                        None => started_titles.push(title),
                    }
                    active = Some(request);
                }

                prop_assert_eq!(s.state() == SchedulerState::Uploading, active.is_some());
            }

            let mut sorted = started_titles.clone();
            sorted.sort();
            prop_assert_eq!(started_titles, sorted);
        }

        #[test]
        fn prop_no_retry_before_deadline(minutes in 0i64..(48 * 60)) {
            let mut s = scheduler(StubCredentials::valid());
            let t0 = pacific(2024, 11, 2, 18, 0);
            let a = started(s.enqueue(job("a"), t0));
            s.on_transfer_finished(a.attempt, UploadOutcome::FailedQuota, t0);
            let deadline = s.suspension().unwrap().deadline;

            let now = t0 + Duration::minutes(minutes);
            let effect = s.tick(now);
            if now < deadline {
                prop_assert!(effect.is_none());
                prop_assert_eq!(s.state(), SchedulerState::Suspended);
            } else {
                prop_assert!(matches!(effect, Some(Effect::StartUpload(_))));
                prop_assert!(s.tick(now).is_none());
            }
        }
    }
}
