use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::observer::error::NotifierError;
use crate::observer::notifier::Notification;

/// Delivery channel for change notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifierError>;
}

/// Writes each notification to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifierError> {
        let changed: Vec<&str> = notification.changes.iter().map(|c| c.field.as_str()).collect();
        tracing::info!(
            target: "storefront::notifications",
            entity = notification.entity,
            kind = ?notification.kind,
            changed = ?changed,
            "{}: {}",
            notification.message(),
            notification.snapshot
        );
        Ok(())
    }
}

/// Keeps delivered notifications in memory for inspection
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.delivered.lock().await.clone()
    }

    /// Drain everything delivered so far
    pub async fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.delivered.lock().await)
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifierError> {
        self.delivered.lock().await.push(notification.clone());
        Ok(())
    }
}
