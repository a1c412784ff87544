//! Owner notifications for edited and deleted messages.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};
use wbot_core::{PlatformClient, Result};

/// Longest text the platform accepts in one message, in characters.
pub const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// User (private chat) id of the connection owner.
    pub recipient: i64,
    pub text: String,
    /// Sent instead of `text` when `text` exceeds [`MAX_MESSAGE_LEN`].
    pub overflow: String,
}

impl Notification {
    pub fn new(recipient: i64, text: String, overflow: String) -> Self {
        Self {
            recipient,
            text,
            overflow,
        }
    }

    pub fn overflows(&self) -> bool {
        self.text.chars().count() > MAX_MESSAGE_LEN
    }

    /// The text actually delivered.
    pub fn body(&self) -> &str {
        if self.overflows() {
            &self.overflow
        } else {
            &self.text
        }
    }
}

/// Delivers notifications to connection owners.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Sends notifications as plain-text messages through the tenant's platform client.
pub struct PlatformNotifier {
    client: Arc<dyn PlatformClient>,
}

impl PlatformNotifier {
    pub fn new(client: Arc<dyn PlatformClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for PlatformNotifier {
    #[instrument(skip(self, notification), fields(recipient = notification.recipient))]
    async fn notify(&self, notification: &Notification) -> Result<()> {
        if notification.overflows() {
            debug!("Notification too long, sending overflow notice");
        }
        self.client
            .send_text(notification.recipient, notification.body())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_falls_back_to_overflow_notice() {
        let short = Notification::new(1, "hello".to_string(), "too long".to_string());
        assert_eq!(short.body(), "hello");

        let long = Notification::new(1, "x".repeat(MAX_MESSAGE_LEN + 1), "too long".to_string());
        assert_eq!(long.body(), "too long");

        let exact = Notification::new(1, "y".repeat(MAX_MESSAGE_LEN), "too long".to_string());
        assert_eq!(exact.body().len(), MAX_MESSAGE_LEN);
    }

    #[tokio::test]
    async fn test_mock_notifier_receives_notification() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|n| n.recipient == 7 && n.text == "hi")
            .times(1)
            .returning(|_| Ok(()));

        notifier
            .notify(&Notification::new(7, "hi".to_string(), String::new()))
            .await
            .unwrap();
    }
}
