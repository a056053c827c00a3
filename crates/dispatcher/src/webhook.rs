//! Notification delivery to the bot gateway over HTTP.

use async_trait::async_trait;
use matching::{Notification, NotificationSender, NotifyError};
use reqwest::Client;
use tracing::debug;

/// Posts each notification as JSON to the bot gateway.
///
/// The gateway owns the Telegram bots and turns `actions` into inline
/// keyboards.
#[derive(Debug, Clone)]
pub struct WebhookSender {
    http: Client,
    url: String,
}

impl WebhookSender {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        debug!(recipient = notification.recipient, "Posting notification to gateway");

        let response = self
            .http
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
