//! Notification dispatch interface.

use async_trait::async_trait;
use uuid::Uuid;

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors that can occur during notification dispatch.
///
/// Dispatch is fire-and-forget: callers log these and never let them
/// abort the originating job.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),
}

/// What happened, from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Challenge succeeded; the user moved up a tier.
    LevelPromoted,
    /// Challenge deadline passed short of target; personal accrual blocked.
    ChallengeFailed,
    /// A referred user made their first deposit.
    ReferralBonus,
    /// A departing user's downline and level were transferred in.
    PositionTransferred,
}

/// Interface for user-facing message delivery (mail, SMS, push).
///
/// Implementations:
/// - `LoggingDispatch`: logs every notification, for development
/// - `RecordingDispatch`: in-memory capture for tests
#[async_trait]
pub trait NotificationDispatch: Send + Sync {
    /// Deliver one notification to `user`. `params` carries the
    /// template values.
    async fn notify(
        &self,
        user: Uuid,
        kind: NotificationKind,
        params: serde_json::Value,
    ) -> Result<()>;
}
