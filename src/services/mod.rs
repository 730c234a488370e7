//! Engine services: pure math, batch jobs, and account operations.

pub mod accrual;
pub mod commissions;
pub mod deposits;
pub mod progression;
pub mod rates;
pub mod split;
pub mod sync;
pub mod transfer;

pub use commissions::CommissionAggregator;
pub use deposits::{DepositError, DepositService};
pub use progression::{LevelProgressionJob, ProgressionReport};
pub use rates::RateTable;
pub use split::{split_earnings, EarningsSplit};
pub use sync::{BalanceRepairJob, EarningsSyncJob, RepairReport, SyncReport};
pub use transfer::{PositionTransfer, TransferError};
