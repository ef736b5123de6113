//! Handle for sending messages to the scheduler service.

use std::fmt;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::messages::SchedulerMessage;
use super::snapshot::SchedulerSnapshot;

/// Default mailbox capacity.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Default timeout for send operations when the mailbox is full.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(100);

/// Error type for send operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The service has stopped and is no longer accepting messages.
    Stopped,
    /// The mailbox is full.
    MailboxFull,
    /// The send operation timed out.
    Timeout,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Stopped => write!(f, "Scheduler has stopped"),
            SendError::MailboxFull => write!(f, "Mailbox is full"),
            SendError::Timeout => write!(f, "Send operation timed out"),
        }
    }
}

impl std::error::Error for SendError {}

/// Create a scheduler mailbox with the default capacity.
pub fn channel(
    cancellation_token: CancellationToken,
) -> (SchedulerHandle, mpsc::Receiver<SchedulerMessage>) {
    let (tx, rx) = mpsc::channel(DEFAULT_MAILBOX_CAPACITY);
    (SchedulerHandle::new(tx, cancellation_token), rx)
}

/// A cloneable handle to the scheduler service.
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerMessage>,
    cancellation_token: CancellationToken,
}

impl SchedulerHandle {
    pub fn new(sender: mpsc::Sender<SchedulerMessage>, cancellation_token: CancellationToken) -> Self {
        Self {
            sender,
            cancellation_token,
        }
    }

    /// Send a message, waiting briefly if the mailbox is full.
    pub async fn send(&self, msg: SchedulerMessage) -> Result<(), SendError> {
        self.send_with_timeout(msg, DEFAULT_SEND_TIMEOUT).await
    }

    /// Send a message with a custom timeout.
    pub async fn send_with_timeout(
        &self,
        msg: SchedulerMessage,
        timeout: Duration,
    ) -> Result<(), SendError> {
        // Fast path: try non-blocking send first
        match self.sender.try_send(msg) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(msg)) => {
                match tokio::time::timeout(timeout, self.sender.reserve()).await {
                    Ok(Ok(permit)) => {
                        permit.send(msg);
                        Ok(())
                    }
                    Ok(Err(_)) => Err(SendError::Stopped),
                    Err(_) => Err(SendError::Timeout),
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SendError::Stopped),
        }
    }

    /// Send a message, waiting as long as it takes for mailbox space.
    ///
    /// Used for results that must not be lost, such as transfer outcomes.
    pub async fn deliver(&self, msg: SchedulerMessage) -> Result<(), SendError> {
        self.sender.send(msg).await.map_err(|_| SendError::Stopped)
    }

    /// Try to send a message without blocking.
    pub fn try_send(&self, msg: SchedulerMessage) -> Result<(), SendError> {
        match self.sender.try_send(msg) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(SendError::MailboxFull),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SendError::Stopped),
        }
    }

    /// Send from a thread outside the runtime, such as a watcher callback.
    ///
    /// Must not be called from within an async context.
    pub fn blocking_send(&self, msg: SchedulerMessage) -> Result<(), SendError> {
        self.sender
            .blocking_send(msg)
            .map_err(|_| SendError::Stopped)
    }

    /// Current state of the scheduler.
    pub async fn snapshot(&self) -> Result<SchedulerSnapshot, SendError> {
        let (tx, rx) = oneshot::channel();
        self.send(SchedulerMessage::GetSnapshot(tx)).await?;
        rx.await.map_err(|_| SendError::Stopped)
    }

    /// Ask the service loop to stop after the current message.
    pub async fn stop(&self) -> Result<(), SendError> {
        self.send(SchedulerMessage::Stop).await
    }

    /// Cancel the service.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// A child token that is cancelled together with the service.
    pub fn child_token(&self) -> CancellationToken {
        self.cancellation_token.child_token()
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("capacity", &self.sender.capacity())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VideoJob;

    fn handle(capacity: usize) -> (SchedulerHandle, mpsc::Receiver<SchedulerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (SchedulerHandle::new(tx, CancellationToken::new()), rx)
    }

    #[tokio::test]
    async fn test_send() {
        let (handle, mut rx) = handle(10);
        handle
            .send(SchedulerMessage::FileFinalized(VideoJob::new("/v/a/a.mp4")))
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            SchedulerMessage::FileFinalized(job) => assert_eq!(job.title(), "a"),
            other => panic!("unexpected message {}", other.name()),
        }
    }

    #[tokio::test]
    async fn test_try_send_mailbox_full() {
        let (handle, _rx) = handle(1);
        handle.try_send(SchedulerMessage::CredentialsRefreshed).unwrap();
        assert_eq!(
            handle.try_send(SchedulerMessage::CredentialsRefreshed),
            Err(SendError::MailboxFull)
        );
        assert_eq!(
            handle
                .send_with_timeout(
                    SchedulerMessage::CredentialsRefreshed,
                    Duration::from_millis(10)
                )
                .await,
            Err(SendError::Timeout)
        );
    }

    #[tokio::test]
    async fn test_send_after_stop() {
        let (handle, rx) = handle(10);
        drop(rx);
        assert_eq!(handle.stop().await, Err(SendError::Stopped));
        assert_eq!(handle.snapshot().await.unwrap_err(), SendError::Stopped);
    }

    #[tokio::test]
    async fn test_blocking_send_from_thread() {
        let (handle, mut rx) = handle(10);
        std::thread::spawn(move || {
            handle
                .blocking_send(SchedulerMessage::CredentialsRefreshed)
                .unwrap();
        })
        .join()
        .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(SchedulerMessage::CredentialsRefreshed)
        ));
    }

    #[test]
    fn test_cancel() {
        let (handle, _rx) = handle(1);
        let child = handle.child_token();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(child.is_cancelled());
    }
}
