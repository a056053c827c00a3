//! Notification types and the sender trait.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::NotifyError;

/// A button attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Button label shown to the user.
    pub label: String,
    /// Callback payload the bot front-end routes back to the engine.
    pub callback: String,
}

impl Action {
    pub fn new(label: impl Into<String>, callback: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback: callback.into(),
        }
    }
}

/// A message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Telegram id of the recipient.
    pub recipient: i64,
    pub text: String,
    /// Optional action keyboard.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

impl Notification {
    /// Create a plain text notification.
    pub fn text(recipient: i64, text: impl Into<String>) -> Self {
        Self {
            recipient,
            text: text.into(),
            actions: Vec::new(),
        }
    }

    /// Attach an action keyboard.
    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }
}

/// Trait for delivering notifications to clients, executors and admins.
///
/// Abstracted to support different transports (bot gateway, tests, etc.)
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[async_trait]
impl<T: NotificationSender + ?Sized> NotificationSender for std::sync::Arc<T> {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        (**self).send(notification).await
    }
}

/// Deliver a batch, logging and swallowing failures.
///
/// Returns the number of notifications that could not be delivered.
pub async fn deliver_all<S: NotificationSender + ?Sized>(
    sender: &S,
    outbox: Vec<Notification>,
) -> usize {
    let mut failed = 0;
    for notification in outbox {
        if let Err(e) = sender.send(&notification).await {
            failed += 1;
            warn!(
                recipient = notification.recipient,
                "Failed to deliver notification: {}", e
            );
        }
    }
    failed
}

/// A no-op sender for testing that discards all notifications.
#[derive(Debug, Clone, Default)]
pub struct NoOpSender;

#[async_trait]
impl NotificationSender for NoOpSender {
    async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// A logging sender for debugging that logs all notifications.
#[derive(Debug, Clone, Default)]
pub struct LoggingSender;

#[async_trait]
impl NotificationSender for LoggingSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            "Notify {} ({} actions): {}",
            notification.recipient,
            notification.actions.len(),
            notification.text
        );
        Ok(())
    }
}

/// A sender that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Notifications sent to one recipient.
    pub fn sent_to(&self, recipient: i64) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|n| n.recipient == recipient)
            .collect()
    }

    /// Drain the recorded notifications.
    pub fn take(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|mut sent| std::mem::take(&mut *sent))
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSender;

    #[async_trait]
    impl NotificationSender for FailingSender {
        async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
            Err(NotifyError::Transport("gateway down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_noop_and_logging_senders() {
        let note = Notification::text(1, "test");

        // Should not error
        NoOpSender.send(&note).await.unwrap();
        LoggingSender.send(&note).await.unwrap();
    }

    #[tokio::test]
    async fn test_recording_sender() {
        let sender = RecordingSender::new();
        let outbox = vec![
            Notification::text(1, "one"),
            Notification::text(2, "two").with_actions(vec![Action::new("OK", "ok:1")]),
        ];

        assert_eq!(deliver_all(&sender, outbox).await, 0);
        assert_eq!(sender.sent().len(), 2);
        assert_eq!(sender.sent_to(2)[0].actions[0].callback, "ok:1");
        assert_eq!(sender.take().len(), 2);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_raised() {
        let outbox = vec![Notification::text(1, "a"), Notification::text(2, "b")];
        assert_eq!(deliver_all(&FailingSender, outbox).await, 2);
    }
}
