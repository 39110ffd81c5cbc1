use crate::ports::notification_sender::{
    NotificationError, NotificationSender as NotificationSenderTrait,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// A message accepted by the recording sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub message: String,
    pub recipients: Vec<String>,
}

/// Recording implementation of NotificationSender
///
/// Does not deliver anything. Keeps every accepted message so tests can
/// inspect it, and can be switched into a failing mode.
pub struct NotificationSender {
    sent: Mutex<Vec<SentNotification>>,
    failing: AtomicBool,
}

impl NotificationSender {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make subsequent sends fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages accepted so far
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for NotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSenderTrait for NotificationSender {
    async fn send(&self, message: &str, recipients: &[String]) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError("mail transport unavailable".to_string()));
        }

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentNotification {
                message: message.to_string(),
                recipients: recipients.to_vec(),
            });
        Ok(())
    }
}
