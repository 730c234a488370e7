//! Investments: a user's principal running against an opportunity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Investment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    Active,
    PendingSale,
    Withdrawn,
    Completed,
}

impl InvestmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PendingSale => "pending_sale",
            Self::Withdrawn => "withdrawn",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "pending_sale" => Some(Self::PendingSale),
            "withdrawn" => Some(Self::Withdrawn),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// One user's principal in one opportunity.
///
/// `base_rate` and `weekly_rate` are frozen at creation; a later level
/// change on the owner does not retroactively change a running
/// investment's rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub id: Uuid,
    pub owner: Uuid,
    pub opportunity: Uuid,
    /// Principal. Grows only through top-ups.
    pub amount: Decimal,
    /// Opportunity base rate at creation, percent per week.
    pub base_rate: Decimal,
    /// Base rate plus the owner's level bonus at creation, percent per week.
    pub weekly_rate: Decimal,
    /// Accrual cap in weeks.
    pub max_weeks: u32,
    pub start_date: DateTime<Utc>,
    /// `start_date` plus `max_weeks`.
    pub end_date: DateTime<Utc>,
    pub status: InvestmentStatus,
    /// High-water mark of gross earnings already distributed by the sync
    /// job. Monotonically non-decreasing, starts at 0.
    pub last_synced_earnings: Decimal,
    /// Optimistic-concurrency token, bumped by the store on every save.
    pub version: u64,
}

impl Investment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        owner: Uuid,
        opportunity: Uuid,
        amount: Decimal,
        base_rate: Decimal,
        weekly_rate: Decimal,
        max_weeks: u32,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            opportunity,
            amount,
            base_rate,
            weekly_rate,
            max_weeks,
            start_date,
            end_date: start_date + chrono::Duration::weeks(max_weeks as i64),
            status: InvestmentStatus::Active,
            last_synced_earnings: Decimal::ZERO,
            version: 0,
        }
    }

    /// Whether this investment still accrues earnings. A pending resale
    /// keeps accruing until it actually changes hands; the terminal
    /// states stop accrual.
    pub fn accrues(&self) -> bool {
        matches!(
            self.status,
            InvestmentStatus::Active | InvestmentStatus::PendingSale
        )
    }

    /// Advance the sync watermark. The watermark only ever moves forward:
    /// a recomputed gross below the stored mark leaves it untouched.
    pub fn advance_watermark(&mut self, gross: Decimal) {
        if gross > self.last_synced_earnings {
            self.last_synced_earnings = gross;
        }
    }

    /// Top-up: principal grows in place.
    pub fn increase_principal(&mut self, amount: Decimal) {
        self.amount += amount;
    }
}
