//! Withdrawals of earned gains or invested capital.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalKind {
    /// Withdrawal of synced earnings. Completed gains withdrawals are
    /// what the balance repair subtracts from recomputed gross.
    Gains,
    /// Withdrawal of principal. Triggers the position-transfer flow.
    Capital,
}

impl WithdrawalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gains => "gains",
            Self::Capital => "capital",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "gains" => Some(Self::Gains),
            "capital" => Some(Self::Capital),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: Uuid,
    pub user: Uuid,
    pub amount: Decimal,
    pub kind: WithdrawalKind,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
}

impl Withdrawal {
    pub fn completed(
        id: Uuid,
        user: Uuid,
        amount: Decimal,
        kind: WithdrawalKind,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user,
            amount,
            kind,
            status: WithdrawalStatus::Completed,
            requested_at,
        }
    }
}
