//! Earnings synchronization: distributing accrued earnings to balances.
//!
//! Two jobs live here. [`EarningsSyncJob`] is the steady-state pass: it
//! brings every accruing investment's distributed earnings up to date
//! with its theoretical gross accrual, crediting the investor's balance
//! and the sponsor's commission total, and advances the per-investment
//! watermark. [`BalanceRepairJob`] is the administrator-triggered
//! recovery pass that recomputes balances from scratch.
//!
//! ## Concurrency
//!
//! The watermark-advance pattern is not safe under concurrent execution
//! over the same investment, so each distribution is committed with a
//! version check and both jobs serialize whole passes through a shared
//! pass lock. Overlapping invocations queue rather than interleave; the
//! repair job must share the lock of the sync job it reconciles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ReferralConfig;
use crate::domain::{Investment, User};
use crate::interfaces::store::{PlatformStore, StoreError};
use crate::services::accrual::investment_gross;
use crate::services::split::split_earnings;

/// Totals from one sync pass.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Accruing investments examined.
    pub examined: usize,
    /// Investments whose fresh accrual was distributed.
    pub synced: usize,
    /// Investments with nothing new to distribute.
    pub up_to_date: usize,
    /// Investments skipped because a concurrent pass got there first.
    pub conflicts: usize,
    /// Investments skipped on data-integrity errors.
    pub failures: usize,
    /// Total credited to investor balances.
    pub distributed: Decimal,
    /// Total credited to sponsor commission totals.
    pub commissions: Decimal,
    /// Total held back from blocked users.
    pub forfeited: Decimal,
}

enum Outcome {
    UpToDate,
    Conflict,
    Distributed {
        investor: Decimal,
        commission: Decimal,
        forfeited: Decimal,
    },
}

/// Periodic earnings distribution pass.
///
/// Idempotent at any cadence: a second run with no elapsed time finds
/// every watermark already at gross and changes nothing.
pub struct EarningsSyncJob {
    store: Arc<dyn PlatformStore>,
    referral: ReferralConfig,
    pass_lock: Arc<Mutex<()>>,
}

impl EarningsSyncJob {
    pub fn new(store: Arc<dyn PlatformStore>, referral: ReferralConfig) -> Self {
        Self {
            store,
            referral,
            pass_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Share a pass lock with another job (the balance repair) that must
    /// never run concurrently with this one.
    pub fn with_pass_lock(
        store: Arc<dyn PlatformStore>,
        referral: ReferralConfig,
        pass_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            store,
            referral,
            pass_lock,
        }
    }

    pub fn pass_lock(&self) -> Arc<Mutex<()>> {
        self.pass_lock.clone()
    }

    /// Run one full pass, evaluating every investment at the same `now`.
    ///
    /// Per-investment processing is independent: a missing user or a
    /// stale version skips that one investment and the pass continues.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<SyncReport, StoreError> {
        let _pass = self.pass_lock.lock().await;

        let investments = self.store.active_investments().await?;
        let mut report = SyncReport {
            examined: investments.len(),
            ..SyncReport::default()
        };

        for investment in &investments {
            match self.sync_one(investment, now).await {
                Ok(Outcome::UpToDate) => report.up_to_date += 1,
                Ok(Outcome::Conflict) => {
                    debug!(investment = %investment.id, "Concurrent pass owns this investment");
                    report.conflicts += 1;
                }
                Ok(Outcome::Distributed {
                    investor,
                    commission,
                    forfeited,
                }) => {
                    report.synced += 1;
                    report.distributed += investor;
                    report.commissions += commission;
                    report.forfeited += forfeited;
                }
                Err(e) => {
                    warn!(investment = %investment.id, error = %e, "Sync failed, continuing");
                    report.failures += 1;
                }
            }
        }

        info!(
            examined = report.examined,
            synced = report.synced,
            up_to_date = report.up_to_date,
            conflicts = report.conflicts,
            failures = report.failures,
            distributed = %report.distributed,
            commissions = %report.commissions,
            "Earnings sync pass complete"
        );
        Ok(report)
    }

    async fn sync_one(
        &self,
        investment: &Investment,
        now: DateTime<Utc>,
    ) -> Result<Outcome, StoreError> {
        let gross = investment_gross(investment, now);
        let delta = gross - investment.last_synced_earnings;
        // A recomputed gross below the watermark (rate corrected
        // elsewhere, clock skew) is not an error; the watermark never
        // moves backwards and balances are never decremented.
        if delta <= Decimal::ZERO {
            return Ok(Outcome::UpToDate);
        }

        let mut owner = self.store.user(investment.owner).await?;
        let sponsor_id = owner.referred_by;
        let split = split_earnings(delta, sponsor_id.is_some(), self.referral.commission_cut);

        let mut updated = investment.clone();
        updated.advance_watermark(gross);

        let (investor, forfeited) = if owner.benefits_blocked {
            owner.forfeit(split.investor_share);
            (Decimal::ZERO, split.investor_share)
        } else {
            owner.credit_personal(split.investor_share);
            (split.investor_share, Decimal::ZERO)
        };

        let mut users = vec![owner];
        let mut commission = Decimal::ZERO;
        if let Some(sponsor_id) = sponsor_id {
            if split.sponsor_share > Decimal::ZERO {
                match self.store.user(sponsor_id).await {
                    Ok(mut sponsor) => {
                        sponsor.credit_commission(split.sponsor_share);
                        commission = split.sponsor_share;
                        users.push(sponsor);
                    }
                    Err(StoreError::UserNotFound(_)) => {
                        warn!(
                            investment = %investment.id,
                            sponsor = %sponsor_id,
                            "Sponsor record missing, commission share dropped"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        match self.store.persist_distribution(&updated, &users).await {
            Ok(()) => Ok(Outcome::Distributed {
                investor,
                commission,
                forfeited,
            }),
            Err(StoreError::VersionConflict { .. }) => Ok(Outcome::Conflict),
            Err(e) => Err(e),
        }
    }
}

/// Totals from one repair pass.
#[derive(Debug, Clone, Default)]
pub struct RepairReport {
    pub repaired: usize,
    pub failures: usize,
    /// Sum of the balances written.
    pub total_written: Decimal,
}

/// Administrator-triggered balance reconstruction.
///
/// Recomputes gross earnings for every investment of every user from
/// scratch, subtracts completed gains withdrawals, and overwrites the
/// balance with the non-negative remainder. Watermarks are realigned to
/// the recomputed gross. This is a destructive overwrite, not an
/// incremental distribution; it shares the sync job's pass lock so the
/// two can never interleave.
pub struct BalanceRepairJob {
    store: Arc<dyn PlatformStore>,
    pass_lock: Arc<Mutex<()>>,
}

impl BalanceRepairJob {
    pub fn new(store: Arc<dyn PlatformStore>, pass_lock: Arc<Mutex<()>>) -> Self {
        Self { store, pass_lock }
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RepairReport, StoreError> {
        let _pass = self.pass_lock.lock().await;

        let users = self.store.users().await?;
        let mut report = RepairReport::default();

        for mut user in users {
            match self.repair_one(&mut user, now).await {
                Ok(balance) => {
                    report.repaired += 1;
                    report.total_written += balance;
                }
                Err(e) => {
                    warn!(user = %user.id, error = %e, "Balance repair failed, continuing");
                    report.failures += 1;
                }
            }
        }

        info!(
            repaired = report.repaired,
            failures = report.failures,
            total_written = %report.total_written,
            "Balance repair pass complete"
        );
        Ok(report)
    }

    async fn repair_one(&self, user: &mut User, now: DateTime<Utc>) -> Result<Decimal, StoreError> {
        let investments = self.store.investments_of(user.id).await?;

        let mut gross_total = Decimal::ZERO;
        for investment in investments {
            let gross = investment_gross(&investment, now);
            gross_total += gross;

            let mut updated = investment.clone();
            updated.advance_watermark(gross);
            if updated.last_synced_earnings != investment.last_synced_earnings {
                self.store.save_investment(&updated).await?;
            }
        }

        let withdrawn = self.store.withdrawn_gains(user.id).await?;
        user.balance = (gross_total - withdrawn).max(Decimal::ZERO);
        self.store.save_user(user).await?;
        Ok(user.balance)
    }
}
