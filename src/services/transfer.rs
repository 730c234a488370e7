//! Capital-withdrawal-with-replacement: transferring a departing user's
//! position in the referral graph to a replacement node.
//!
//! This is a rare, manually-triggered operation, modeled as one explicit
//! graph reassignment rather than a side effect of generic user updates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{InvestmentStatus, Withdrawal, WithdrawalKind};
use crate::interfaces::notifier::{NotificationDispatch, NotificationKind};
use crate::interfaces::store::{PlatformStore, StoreError};

/// Result type for transfer operations.
pub type Result<T> = std::result::Result<T, TransferError>;

/// Errors that can occur during a position transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("A user cannot replace themselves")]
    SameUser,

    #[error("Replacement {0} sits in the departing user's downline")]
    ReplacementInDownline(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Executes the position-transfer flow.
pub struct PositionTransfer {
    store: Arc<dyn PlatformStore>,
    notifier: Arc<dyn NotificationDispatch>,
}

impl PositionTransfer {
    pub fn new(store: Arc<dyn PlatformStore>, notifier: Arc<dyn NotificationDispatch>) -> Self {
        Self { store, notifier }
    }

    /// Withdraw `departing`'s capital and hand their position to
    /// `replacement`.
    ///
    /// The replacement inherits the entire direct downline (every
    /// child's sponsor edge is re-pointed) and the departing level if it
    /// is higher than their own. The departing user keeps earned
    /// balances but loses the downline, any running challenge, and all
    /// future personal accrual; their accruing investments are marked
    /// withdrawn. The graph rewrite is persisted as one atomic batch.
    pub async fn transfer_position(
        &self,
        departing: Uuid,
        replacement: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if departing == replacement {
            return Err(TransferError::SameUser);
        }

        let mut leaver = self.store.user(departing).await?;
        let mut heir = self.store.user(replacement).await?;

        let mut downline = self.store.direct_downline(departing).await?;
        if downline.iter().any(|child| child.id == replacement) {
            return Err(TransferError::ReplacementInDownline(replacement));
        }

        for child in &mut downline {
            child.referred_by = Some(heir.id);
            if !heir.referrals.contains(&child.id) {
                heir.referrals.push(child.id);
            }
        }
        heir.level = heir.level.max(leaver.level);

        leaver.referrals.clear();
        leaver.challenge = None;
        leaver.benefits_blocked = true;

        let mut capital = Decimal::ZERO;
        let mut closed = Vec::new();
        for mut investment in self.store.investments_of(departing).await? {
            if investment.accrues() {
                capital += investment.amount;
                investment.status = InvestmentStatus::Withdrawn;
                closed.push(investment);
            }
        }

        let mut batch = downline;
        batch.push(leaver);
        batch.push(heir);
        self.store.save_users(&batch).await?;

        for investment in &closed {
            self.store.save_investment(investment).await?;
        }
        self.store
            .record_withdrawal(&Withdrawal::completed(
                Uuid::new_v4(),
                departing,
                capital,
                WithdrawalKind::Capital,
                now,
            ))
            .await?;

        info!(
            departing = %departing,
            replacement = %replacement,
            capital = %capital,
            "Position transferred"
        );
        let params = json!({ "from": departing });
        if let Err(e) = self
            .notifier
            .notify(replacement, NotificationKind::PositionTransferred, params)
            .await
        {
            warn!(user = %replacement, error = %e, "Transfer notification failed");
        }
        Ok(())
    }
}
