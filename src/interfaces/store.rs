//! Platform persistence interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Investment, Opportunity, User, Withdrawal};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Investment not found: {0}")]
    InvestmentNotFound(Uuid),

    #[error("Opportunity not found: {0}")]
    OpportunityNotFound(Uuid),

    #[error("Version conflict on investment {id}: stored {stored}, submitted {submitted}")]
    VersionConflict { id: Uuid, stored: u64, submitted: u64 },

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Interface for platform persistence.
///
/// All reads used by the batch jobs are expected to be snapshot-consistent
/// for the duration of one pass. Writes that form one logical unit go
/// through the batch methods so implementations can make them atomic.
///
/// Implementations:
/// - `MemoryStore`: in-memory, always available, used in tests
/// - `SqlitePlatformStore`: SQLite storage (`sqlite` feature)
#[async_trait]
pub trait PlatformStore: Send + Sync {
    /// Load a user by id.
    async fn user(&self, id: Uuid) -> Result<User>;

    /// Persist a user record. Last-writer-wins per record.
    async fn save_user(&self, user: &User) -> Result<()>;

    /// Persist several user records as one atomic batch.
    async fn save_users(&self, users: &[User]) -> Result<()>;

    /// All users. Used by the administrative balance repair only.
    async fn users(&self) -> Result<Vec<User>>;

    /// Load an investment by id.
    async fn investment(&self, id: Uuid) -> Result<Investment>;

    /// Persist an investment.
    ///
    /// The submitted `version` must match the stored one; on success the
    /// stored version is bumped. A mismatch fails with
    /// [`StoreError::VersionConflict`] and writes nothing. Absent ids are
    /// inserted.
    async fn save_investment(&self, investment: &Investment) -> Result<()>;

    /// All investments that still accrue earnings.
    async fn active_investments(&self) -> Result<Vec<Investment>>;

    /// All investments owned by `owner`, regardless of status.
    async fn investments_of(&self, owner: Uuid) -> Result<Vec<Investment>>;

    /// Load an opportunity by id.
    async fn opportunity(&self, id: Uuid) -> Result<Opportunity>;

    /// Persist an opportunity.
    async fn save_opportunity(&self, opportunity: &Opportunity) -> Result<()>;

    /// Atomically persist one distribution unit: the advanced investment
    /// watermark together with the credited user records. Subject to the
    /// same version check as [`save_investment`](Self::save_investment),
    /// in which case nothing is written.
    async fn persist_distribution(&self, investment: &Investment, users: &[User]) -> Result<()>;

    /// Atomically persist one confirmed deposit: the new or topped-up
    /// investment, the touched user records, and the opportunity counters.
    async fn persist_deposit(
        &self,
        investment: &Investment,
        users: &[User],
        opportunity: &Opportunity,
    ) -> Result<()>;

    /// Users whose challenge deadline has passed and who are still
    /// unblocked and have deposited at least once.
    async fn users_past_deadline(&self, as_of: DateTime<Utc>) -> Result<Vec<User>>;

    /// Direct downline of `sponsor`.
    async fn direct_downline(&self, sponsor: Uuid) -> Result<Vec<User>>;

    /// Record a withdrawal.
    async fn record_withdrawal(&self, withdrawal: &Withdrawal) -> Result<()>;

    /// Sum of completed gains withdrawals for `user`.
    async fn withdrawn_gains(&self, user: Uuid) -> Result<Decimal>;
}
