//! Domain model: users, investments, opportunities, withdrawals.

pub mod investment;
pub mod money;
pub mod opportunity;
pub mod user;
pub mod withdrawal;

pub use investment::{Investment, InvestmentStatus};
pub use opportunity::Opportunity;
pub use user::{Challenge, User};
pub use withdrawal::{Withdrawal, WithdrawalKind, WithdrawalStatus};
