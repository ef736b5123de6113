//! Scheduler service: owns the state machine and executes its effects.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::machine::{Effect, UploadScheduler};
use super::handle::SchedulerHandle;
use super::messages::SchedulerMessage;
use crate::credentials::CredentialRefresher;
use crate::presenter::Presenter;
use crate::upload::UploadTransport;

/// Default tick interval (1 second).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Runs the scheduler loop.
///
/// All inputs arrive as messages on one mailbox and are applied in order, so
/// the state machine needs no locking.
pub struct SchedulerService {
    scheduler: UploadScheduler,
    transport: Arc<dyn UploadTransport>,
    refresher: Arc<dyn CredentialRefresher>,
    presenter: Option<Box<dyn Presenter>>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    handle: SchedulerHandle,
    receiver: mpsc::Receiver<SchedulerMessage>,
    cancellation_token: CancellationToken,
}

impl SchedulerService {
    /// Build a service reading from the mailbox behind `handle`.
    pub fn new(
        scheduler: UploadScheduler,
        transport: Arc<dyn UploadTransport>,
        refresher: Arc<dyn CredentialRefresher>,
        handle: SchedulerHandle,
        receiver: mpsc::Receiver<SchedulerMessage>,
    ) -> Self {
        let cancellation_token = handle.child_token();
        Self {
            scheduler,
            transport,
            refresher,
            presenter: None,
            clock: Arc::new(SystemClock),
            tick_interval: DEFAULT_TICK_INTERVAL,
            handle,
            receiver,
            cancellation_token,
        }
    }

    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Run until cancelled or stopped; returns the final state machine.
    pub async fn run(mut self) -> UploadScheduler {
        info!(
            root = %self.scheduler.root().display(),
            tick_ms = self.tick_interval.as_millis() as u64,
            "Scheduler started"
        );

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    info!("Scheduler cancelled");
                    break;
                }

                msg = self.receiver.recv() => {
                    let Some(msg) = msg else {
                        debug!("Scheduler mailbox closed");
                        break;
                    };
                    if !self.handle_message(msg) {
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let effect = self.scheduler.tick(self.clock.now());
                    self.apply(effect);
                    self.render();
                }
            }
        }

        if let Some(session) = self.scheduler.session() {
            warn!(
                attempt = %session.attempt(),
                path = %session.job().path().display(),
                "Stopping with an upload in flight"
            );
        }
        info!("Scheduler stopped");
        self.scheduler
    }

    /// Apply one message; returns `false` when the loop should stop.
    fn handle_message(&mut self, msg: SchedulerMessage) -> bool {
        debug!(message = msg.name(), "Scheduler message");
        let now = self.clock.now();

        let effect = match msg {
            SchedulerMessage::FileFinalized(job) => self.scheduler.enqueue(job, now),
            SchedulerMessage::TransferFinished { attempt, outcome } => {
                self.scheduler.on_transfer_finished(attempt, outcome, now)
            }
            SchedulerMessage::CredentialsRefreshed => self.scheduler.on_credentials_refreshed(now),
            SchedulerMessage::CredentialRefreshFailed(reason) => {
                self.scheduler.on_credential_refresh_failed(reason, now);
                None
            }
            SchedulerMessage::ConsentRequired(url) => {
                self.scheduler.on_consent_required(url);
                None
            }
            SchedulerMessage::GetSnapshot(reply) => {
                let _ = reply.send(self.scheduler.snapshot(now));
                return true;
            }
            SchedulerMessage::Stop => return false,
        };

        self.apply(effect);
        self.render();
        true
    }

    fn apply(&self, effect: Option<Effect>) {
        match effect {
            Some(Effect::StartUpload(request)) => {
                let transport = self.transport.clone();
                let handle = self.handle.clone();
                tokio::spawn(async move {
                    let outcome = transport.upload(&request).await;
                    let msg = SchedulerMessage::TransferFinished {
                        attempt: request.attempt,
                        outcome,
                    };
                    if handle.deliver(msg).await.is_err() {
                        warn!(attempt = %request.attempt, "Scheduler stopped before the upload finished");
                    }
                });
            }
            Some(Effect::RefreshCredentials(status)) => {
                debug!(status = ?status, "Starting credential refresh");
                let refresher = self.refresher.clone();
                let handle = self.handle.clone();
                tokio::spawn(async move {
                    let msg = match refresher.refresh().await {
                        Ok(()) => SchedulerMessage::CredentialsRefreshed,
                        Err(e) => SchedulerMessage::CredentialRefreshFailed(e.to_string()),
                    };
                    if handle.deliver(msg).await.is_err() {
                        debug!("Scheduler stopped before the credential refresh finished");
                    }
                });
            }
            None => {}
        }
    }

    fn render(&mut self) {
        if let Some(presenter) = self.presenter.as_mut() {
            let snapshot = self.scheduler.snapshot(self.clock.now());
            presenter.render(&snapshot);
        }
    }
}
