use crate::ports::notification_sender::{
    NotificationError, NotificationSender as NotificationSenderTrait,
};
use async_trait::async_trait;

/// Default subject line for overdue notices
pub const OVERDUE_SUBJECT: &str = "Overdue loan";

/// NotificationSender that writes each message to the tracing log
///
/// Stands in for a mail transport. One log event is emitted per message,
/// carrying the sender, subject and every recipient.
pub struct TracingNotificationSender {
    sender: String,
    subject: String,
}

impl TracingNotificationSender {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            subject: OVERDUE_SUBJECT.to_string(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }
}

#[async_trait]
impl NotificationSenderTrait for TracingNotificationSender {
    async fn send(&self, message: &str, recipients: &[String]) -> Result<(), NotificationError> {
        if recipients.is_empty() {
            return Err(NotificationError("no recipients".to_string()));
        }

        tracing::info!(
            from = %self.sender,
            subject = %self.subject,
            to = ?recipients,
            %message,
            "notification sent"
        );
        Ok(())
    }
}
