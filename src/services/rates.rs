//! Level-bonus rate tables.
//!
//! Two tables ship, and they intentionally disagree: the production data
//! this engine was built against carried both a flat 0/5/10 bonus and a
//! five-tier 10/15/20/25/30 ladder, maintained independently. Which one
//! is authoritative is a deployment decision (`engine.rate_table` in the
//! config), not something this module guesses at.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Maps a user's level to a weekly-rate bonus, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateTable {
    /// Flat table: level 1 earns no bonus, level 2 earns 5, and every
    /// level from 3 up earns 10.
    #[default]
    Standard,
    /// Five-tier ladder: 10/15/20/25/30, clamped at tier 5.
    Ladder,
}

impl RateTable {
    /// Bonus percentage for `level`. Total over all `level >= 1`.
    pub fn bonus(&self, level: u32) -> Decimal {
        match self {
            Self::Standard => match level {
                0 | 1 => Decimal::ZERO,
                2 => Decimal::from(5u32),
                _ => Decimal::from(10u32),
            },
            Self::Ladder => {
                let tier = level.clamp(1, 5);
                Decimal::from(5 + 5 * tier)
            }
        }
    }

    /// Final weekly accrual rate: opportunity base rate plus level bonus.
    pub fn final_rate(&self, base_rate: Decimal, level: u32) -> Decimal {
        base_rate + self.bonus(level)
    }
}
