//! Gross earnings accrual.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::money::round_money;
use crate::domain::Investment;

/// Seconds in one accrual week.
const SECONDS_PER_WEEK: i64 = 7 * 24 * 60 * 60;

/// Gross earnings accrued by one investment as of `as_of`.
///
/// Elapsed time counts in fractional weeks, clamped to `[0, max_weeks]`,
/// so the result is monotonically non-decreasing in `as_of` and constant
/// once the investment has fully matured. An `as_of` before `start` and
/// a zero principal both yield zero.
pub fn gross_earnings(
    principal: Decimal,
    weekly_rate_percent: Decimal,
    start: DateTime<Utc>,
    as_of: DateTime<Utc>,
    max_weeks: u32,
) -> Decimal {
    let elapsed_secs = (as_of - start).num_seconds();
    if elapsed_secs <= 0 || principal.is_zero() {
        return Decimal::ZERO;
    }

    let elapsed_weeks =
        (Decimal::from(elapsed_secs) / Decimal::from(SECONDS_PER_WEEK)).min(Decimal::from(max_weeks));
    let weekly_earning = principal * weekly_rate_percent / Decimal::ONE_HUNDRED;

    round_money(weekly_earning * elapsed_weeks)
}

/// Gross earnings for `investment` as of `as_of`.
pub fn investment_gross(investment: &Investment, as_of: DateTime<Utc>) -> Decimal {
    gross_earnings(
        investment.amount,
        investment.weekly_rate,
        investment.start_date,
        as_of,
        investment.max_weeks,
    )
}

/// Live gross earnings over a user's investments, counting only those
/// that still accrue. Includes accrual past the last sync watermark.
pub fn live_earnings(investments: &[Investment], as_of: DateTime<Utc>) -> Decimal {
    investments
        .iter()
        .filter(|inv| inv.accrues())
        .map(|inv| investment_gross(inv, as_of))
        .sum()
}
