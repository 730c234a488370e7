//! Engine configuration: rates, referral cuts, challenge windows.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::services::rates::RateTable;

/// Referral commission configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReferralConfig {
    /// Sponsor's cut of a downline member's freshly accrued earnings,
    /// in percent.
    pub commission_cut: Decimal,
    /// Flat bonus credited to a sponsor when a referred user makes their
    /// first deposit. Zero disables the bonus.
    pub signup_bonus: Decimal,
    /// Depth cap for the live commission tree walk.
    pub max_depth: u32,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            commission_cut: Decimal::from(10u32),
            signup_bonus: Decimal::ZERO,
            max_depth: 10,
        }
    }
}

/// Level challenge configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Window length in weeks for the first challenge (level 1).
    pub first_window_weeks: i64,
    /// Window length in weeks for every later challenge.
    pub window_weeks: i64,
    /// Target = qualifying deposit x this multiplier.
    pub target_multiplier: Decimal,
    /// Top tier of the ladder. Reaching it ends challenge tracking.
    pub max_level: u32,
}

impl ChallengeConfig {
    /// Window length for a challenge opened at `level`.
    pub fn window_for(&self, level: u32) -> i64 {
        if level <= 1 {
            self.first_window_weeks
        } else {
            self.window_weeks
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            first_window_weeks: 3,
            window_weeks: 2,
            target_multiplier: Decimal::from(5u32),
            max_level: 5,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Which level-bonus table accrual rates are built from.
    pub rate_table: RateTable,
    pub referral: ReferralConfig,
    pub challenge: ChallengeConfig,
}
