//! Notification dispatch implementations.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::interfaces::notifier::{NotificationDispatch, NotificationKind, NotifyError, Result};

/// Dispatcher that logs every notification.
///
/// Useful for development and for deployments where delivery is handled
/// by a downstream log shipper.
#[derive(Default)]
pub struct LoggingDispatch;

impl LoggingDispatch {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatch for LoggingDispatch {
    async fn notify(
        &self,
        user: Uuid,
        kind: NotificationKind,
        params: serde_json::Value,
    ) -> Result<()> {
        info!(user = %user, kind = ?kind, params = %params, "Notification");
        Ok(())
    }
}

/// A captured notification.
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub user: Uuid,
    pub kind: NotificationKind,
    pub params: serde_json::Value,
}

/// Dispatcher that records notifications in memory, for tests.
#[derive(Default)]
pub struct RecordingDispatch {
    sent: RwLock<Vec<SentNotification>>,
    fail: RwLock<bool>,
}

impl RecordingDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent dispatch fail, to test that callers treat
    /// delivery as fire-and-forget.
    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.read().await.clone()
    }

    pub async fn sent_to(&self, user: Uuid) -> Vec<SentNotification> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| n.user == user)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationDispatch for RecordingDispatch {
    async fn notify(
        &self,
        user: Uuid,
        kind: NotificationKind,
        params: serde_json::Value,
    ) -> Result<()> {
        if *self.fail.read().await {
            return Err(NotifyError::Delivery("dispatch disabled".to_string()));
        }
        self.sent
            .write()
            .await
            .push(SentNotification { user, kind, params });
        Ok(())
    }
}
