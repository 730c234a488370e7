//! User accounts, balances, and challenge state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ChallengeConfig;

/// A deadline-boxed deposit target a user must reach to advance a level.
///
/// A user has at most one active challenge at a time, which the
/// `Option<Challenge>` on [`User`] encodes directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    /// When the current level window opened.
    pub started_at: DateTime<Utc>,
    /// Instant the target must be reached by. Always after `started_at`.
    pub deadline: DateTime<Utc>,
    /// Amount to accumulate in the pot before the deadline.
    pub target: Decimal,
    /// Pot accumulated from the user's own and direct-downline deposits.
    pub cagnotte: Decimal,
    /// The deposit the ladder targets derive from. Carries over from
    /// challenge to challenge so each window's target has a stable base.
    pub qualifying_deposit: Decimal,
}

impl Challenge {
    /// Open a fresh challenge window at `level`.
    pub fn open(
        qualifying_deposit: Decimal,
        level: u32,
        now: DateTime<Utc>,
        config: &ChallengeConfig,
    ) -> Self {
        Self {
            started_at: now,
            deadline: now + chrono::Duration::weeks(config.window_for(level)),
            target: qualifying_deposit * config.target_multiplier,
            cagnotte: Decimal::ZERO,
            qualifying_deposit,
        }
    }

    /// Whether the pot has reached the target. The boundary is inclusive:
    /// reaching the target exactly at the deadline instant still counts.
    pub fn reached(&self) -> bool {
        self.cagnotte >= self.target
    }
}

/// A platform member.
///
/// `balance` and `total_commissions` are the *synchronized* figures: they
/// only move when a sync pass distributes accrued earnings. Live figures
/// ahead of the last pass are computed on demand by the services layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Current tier, starting at 1. Non-decreasing except through a
    /// position transfer.
    pub level: u32,
    /// Synced personal earnings.
    pub balance: Decimal,
    /// Synced referral earnings from the downline.
    pub total_commissions: Decimal,
    /// Flat-rate referral sign-up bonuses.
    pub bonus_parrainage: Decimal,
    /// Cumulative principal deposited.
    pub total_invested: Decimal,
    /// Running total of personal earnings ever credited.
    pub total_benefits: Decimal,
    /// Personal earnings accrued while blocked. Held, not credited.
    pub forfeited_earnings: Decimal,
    /// When true, personal accrual is suppressed. Commission accrual to
    /// this user's upline is unaffected.
    pub benefits_blocked: bool,
    /// Active challenge, if any.
    pub challenge: Option<Challenge>,
    /// Upline sponsor. Set at registration, immutable except through a
    /// position transfer.
    pub referred_by: Option<Uuid>,
    /// Direct downline.
    pub referrals: Vec<Uuid>,
}

impl User {
    /// Create a level-1 user with no sponsor.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            level: 1,
            balance: Decimal::ZERO,
            total_commissions: Decimal::ZERO,
            bonus_parrainage: Decimal::ZERO,
            total_invested: Decimal::ZERO,
            total_benefits: Decimal::ZERO,
            forfeited_earnings: Decimal::ZERO,
            benefits_blocked: false,
            challenge: None,
            referred_by: None,
            referrals: Vec::new(),
        }
    }

    /// Create a level-1 user sponsored by `sponsor`.
    pub fn referred(id: Uuid, sponsor: Uuid) -> Self {
        Self {
            referred_by: Some(sponsor),
            ..Self::new(id)
        }
    }

    /// Credit synced personal earnings.
    pub fn credit_personal(&mut self, share: Decimal) {
        self.balance += share;
        self.total_benefits += share;
    }

    /// Hold personal earnings accrued while blocked.
    pub fn forfeit(&mut self, share: Decimal) {
        self.forfeited_earnings += share;
    }

    /// Credit synced referral commissions.
    pub fn credit_commission(&mut self, share: Decimal) {
        self.total_commissions += share;
    }

    /// Add a deposit to the active challenge pot, if one is open.
    pub fn add_to_pot(&mut self, amount: Decimal) {
        if let Some(challenge) = &mut self.challenge {
            challenge.cagnotte += amount;
        }
    }

    pub fn has_active_challenge(&self) -> bool {
        self.challenge.is_some()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn config() -> ChallengeConfig {
        ChallengeConfig::default()
    }

    #[test]
    fn test_open_challenge_level_one_window() {
        let now = Utc::now();
        let challenge = Challenge::open(dec!(1000), 1, now, &config());
        assert_eq!(challenge.deadline, now + chrono::Duration::weeks(3));
        assert_eq!(challenge.target, dec!(5000));
        assert_eq!(challenge.cagnotte, Decimal::ZERO);
        assert!(challenge.deadline > challenge.started_at);
    }

    #[test]
    fn test_open_challenge_higher_level_window() {
        let now = Utc::now();
        let challenge = Challenge::open(dec!(1000), 3, now, &config());
        assert_eq!(challenge.deadline, now + chrono::Duration::weeks(2));
    }

    #[test]
    fn test_reached_boundary_is_inclusive() {
        let now = Utc::now();
        let mut challenge = Challenge::open(dec!(100), 1, now, &config());
        challenge.cagnotte = dec!(499.99);
        assert!(!challenge.reached());
        challenge.cagnotte = dec!(500);
        assert!(challenge.reached());
    }

    #[test]
    fn test_pot_accumulates_only_with_open_challenge() {
        let mut user = User::new(Uuid::new_v4());
        user.add_to_pot(dec!(100));
        assert!(user.challenge.is_none());

        user.challenge = Some(Challenge::open(dec!(100), 1, Utc::now(), &config()));
        user.add_to_pot(dec!(100));
        user.add_to_pot(dec!(50));
        assert_eq!(user.challenge.unwrap().cagnotte, dec!(150));
    }

    #[test]
    fn test_credit_personal_tracks_running_total() {
        let mut user = User::new(Uuid::new_v4());
        user.credit_personal(dec!(90));
        user.credit_personal(dec!(10));
        assert_eq!(user.balance, dec!(100));
        assert_eq!(user.total_benefits, dec!(100));
    }
}
