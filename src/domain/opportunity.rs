//! Investment opportunities: the rate catalog.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog entry an investment runs against.
///
/// `base_rate` is the only input the accrual core takes from here; the
/// aggregate counters are bookkeeping updated in the same atomic persist
/// as investment creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Uuid,
    pub name: String,
    /// Percent per week, before level bonus.
    pub base_rate: Decimal,
    pub min_investment: Decimal,
    pub max_investment: Decimal,
    /// Accrual cap for investments created against this opportunity.
    pub duration_weeks: u32,
    pub total_invested: Decimal,
    pub active_investors: u32,
}

impl Opportunity {
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        base_rate: Decimal,
        min_investment: Decimal,
        max_investment: Decimal,
        duration_weeks: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            base_rate,
            min_investment,
            max_investment,
            duration_weeks,
            total_invested: Decimal::ZERO,
            active_investors: 0,
        }
    }

    /// Record a confirmed deposit against this opportunity's counters.
    pub fn record_deposit(&mut self, amount: Decimal, new_investor: bool) {
        self.total_invested += amount;
        if new_investor {
            self.active_investors += 1;
        }
    }
}
