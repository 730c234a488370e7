//! Referral split of freshly accrued earnings.

use rust_decimal::Decimal;

use crate::domain::money::{percent_of, round_money};

/// How one accrual delta divides between investor and sponsor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarningsSplit {
    pub investor_share: Decimal,
    pub sponsor_share: Decimal,
}

/// Split `gross_delta` between the investor and their direct upline.
///
/// Without a sponsor the investor keeps everything. With one, the sponsor
/// takes `cut_percent` and the investor the remainder. The two shares are
/// rounded independently, so their sum may drift from `gross_delta` by at
/// most one minor currency unit; callers must not expect exact equality.
pub fn split_earnings(gross_delta: Decimal, has_sponsor: bool, cut_percent: Decimal) -> EarningsSplit {
    if !has_sponsor {
        return EarningsSplit {
            investor_share: round_money(gross_delta),
            sponsor_share: Decimal::ZERO,
        };
    }

    EarningsSplit {
        investor_share: percent_of(gross_delta, Decimal::ONE_HUNDRED - cut_percent),
        sponsor_share: percent_of(gross_delta, cut_percent),
    }
}
