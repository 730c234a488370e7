//! Money arithmetic helpers.
//!
//! All monetary amounts are `rust_decimal::Decimal` and are rounded to
//! currency-minor-unit precision (2 decimal places) whenever a figure is
//! distributed to a balance. Intermediate math stays exact.

use rust_decimal::{Decimal, RoundingStrategy};

/// Currency minor-unit precision.
pub const MONEY_SCALE: u32 = 2;

/// Round a monetary amount to minor-unit precision.
///
/// Half-way cases round away from zero, the usual convention for
/// customer-facing currency figures.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `percent` percent of `amount`, rounded to minor-unit precision.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    round_money(amount * percent / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(-10.005)), dec!(-10.01));
        assert_eq!(round_money(dec!(14285.714285)), dec!(14285.71));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(dec!(10000), dec!(10)), dec!(1000.00));
        assert_eq!(percent_of(dec!(33.33), dec!(10)), dec!(3.33));
        assert_eq!(percent_of(dec!(0), dec!(10)), dec!(0.00));
    }
}
