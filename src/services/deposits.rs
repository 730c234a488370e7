//! Confirmed-deposit flow: investment creation, challenge feeding,
//! opportunity counters.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::domain::{Challenge, Investment, User};
use crate::interfaces::notifier::{NotificationDispatch, NotificationKind};
use crate::interfaces::store::{PlatformStore, StoreError};

/// Result type for deposit operations.
pub type Result<T> = std::result::Result<T, DepositError>;

/// Errors that can occur while confirming a deposit.
#[derive(Debug, thiserror::Error)]
pub enum DepositError {
    #[error("Deposit amount must be positive")]
    NonPositiveAmount,

    #[error("Deposit below opportunity minimum of {minimum}")]
    BelowMinimum { minimum: Decimal },

    #[error("Deposit above opportunity maximum of {maximum}")]
    AboveMaximum { maximum: Decimal },

    #[error("Investment {0} no longer accrues and cannot be topped up")]
    NotAccruing(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Turns a confirmed payment into an investment and feeds the challenge
/// machinery.
///
/// The user's first-ever deposit is the qualifying deposit: it opens
/// their level challenge. Every deposit also feeds the direct sponsor's
/// pot, which is how downline deposits count toward a sponsor's own
/// promotion.
pub struct DepositService {
    store: Arc<dyn PlatformStore>,
    notifier: Arc<dyn NotificationDispatch>,
    engine: EngineConfig,
}

impl DepositService {
    pub fn new(
        store: Arc<dyn PlatformStore>,
        notifier: Arc<dyn NotificationDispatch>,
        engine: EngineConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            engine,
        }
    }

    /// Confirm a deposit of `amount` by `user_id` into `opportunity_id`.
    ///
    /// The created investment freezes the weekly rate at the user's
    /// current level bonus; later level changes do not touch it.
    pub async fn confirm(
        &self,
        user_id: Uuid,
        opportunity_id: Uuid,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Investment> {
        if amount <= Decimal::ZERO {
            return Err(DepositError::NonPositiveAmount);
        }

        let mut opportunity = self.store.opportunity(opportunity_id).await?;
        if amount < opportunity.min_investment {
            return Err(DepositError::BelowMinimum {
                minimum: opportunity.min_investment,
            });
        }
        if amount > opportunity.max_investment {
            return Err(DepositError::AboveMaximum {
                maximum: opportunity.max_investment,
            });
        }

        let mut user = self.store.user(user_id).await?;
        let weekly_rate = self
            .engine
            .rate_table
            .final_rate(opportunity.base_rate, user.level);
        let investment = Investment::new(
            Uuid::new_v4(),
            user.id,
            opportunity.id,
            amount,
            opportunity.base_rate,
            weekly_rate,
            opportunity.duration_weeks,
            now,
        );

        let first_deposit = user.total_invested.is_zero();
        user.total_invested += amount;
        if first_deposit {
            user.challenge = Some(Challenge::open(
                amount,
                user.level,
                now,
                &self.engine.challenge,
            ));
        } else {
            user.add_to_pot(amount);
        }

        let mut users = Vec::new();
        let mut bonus_recipient = None;
        if let Some(sponsor_id) = user.referred_by {
            match self.store.user(sponsor_id).await {
                Ok(mut sponsor) => {
                    sponsor.add_to_pot(amount);
                    if first_deposit && self.engine.referral.signup_bonus > Decimal::ZERO {
                        sponsor.bonus_parrainage += self.engine.referral.signup_bonus;
                        bonus_recipient = Some(sponsor.id);
                    }
                    users.push(sponsor);
                }
                Err(StoreError::UserNotFound(_)) => {
                    warn!(user = %user.id, sponsor = %sponsor_id, "Sponsor record missing");
                }
                Err(e) => return Err(e.into()),
            }
        }

        opportunity.record_deposit(amount, true);
        users.push(user);
        self.store
            .persist_deposit(&investment, &users, &opportunity)
            .await?;

        info!(
            user = %user_id,
            opportunity = %opportunity_id,
            amount = %amount,
            first_deposit,
            "Deposit confirmed"
        );

        if let Some(sponsor_id) = bonus_recipient {
            let params = json!({
                "bonus": self.engine.referral.signup_bonus,
                "referred_user": user_id,
            });
            if let Err(e) = self
                .notifier
                .notify(sponsor_id, NotificationKind::ReferralBonus, params)
                .await
            {
                warn!(sponsor = %sponsor_id, error = %e, "Referral bonus notification failed");
            }
        }

        Ok(investment)
    }

    /// Top up a running investment: the principal grows in place, the
    /// rate stays frozen.
    pub async fn top_up(
        &self,
        investment_id: Uuid,
        amount: Decimal,
        _now: DateTime<Utc>,
    ) -> Result<Investment> {
        if amount <= Decimal::ZERO {
            return Err(DepositError::NonPositiveAmount);
        }

        let mut investment = self.store.investment(investment_id).await?;
        if !investment.accrues() {
            return Err(DepositError::NotAccruing(investment.id));
        }

        let mut opportunity = self.store.opportunity(investment.opportunity).await?;
        if investment.amount + amount > opportunity.max_investment {
            return Err(DepositError::AboveMaximum {
                maximum: opportunity.max_investment,
            });
        }

        investment.increase_principal(amount);

        let mut user = self.store.user(investment.owner).await?;
        user.total_invested += amount;
        user.add_to_pot(amount);

        let mut users = Vec::new();
        if let Some(sponsor_id) = user.referred_by {
            match self.store.user(sponsor_id).await {
                Ok(mut sponsor) => {
                    sponsor.add_to_pot(amount);
                    users.push(sponsor);
                }
                Err(StoreError::UserNotFound(_)) => {
                    warn!(user = %user.id, sponsor = %sponsor_id, "Sponsor record missing");
                }
                Err(e) => return Err(e.into()),
            }
        }

        opportunity.record_deposit(amount, false);
        users.push(user);
        self.store
            .persist_deposit(&investment, &users, &opportunity)
            .await?;

        info!(investment = %investment_id, amount = %amount, "Investment topped up");
        Ok(investment)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::ChallengeConfig;
    use crate::domain::Opportunity;
    use crate::notify::RecordingDispatch;
    use crate::storage::memory::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingDispatch>,
        service: DepositService,
        opportunity: Uuid,
    }

    async fn fixture(signup_bonus: Decimal) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingDispatch::new());
        let mut engine = EngineConfig::default();
        engine.referral.signup_bonus = signup_bonus;

        let opportunity = Opportunity::new(
            Uuid::new_v4(),
            "Agro",
            dec!(20),
            dec!(1000),
            dec!(1000000),
            52,
        );
        let opportunity_id = opportunity.id;
        store.save_opportunity(&opportunity).await.unwrap();

        let service = DepositService::new(store.clone(), notifier.clone(), engine);
        Fixture {
            store,
            notifier,
            service,
            opportunity: opportunity_id,
        }
    }

    #[tokio::test]
    async fn test_first_deposit_opens_challenge_and_freezes_rate() {
        let f = fixture(dec!(0)).await;
        let user = User::new(Uuid::new_v4());
        f.store.save_user(&user).await.unwrap();

        let now = Utc::now();
        let investment = f
            .service
            .confirm(user.id, f.opportunity, dec!(10000), now)
            .await
            .unwrap();

        // Level 1: no bonus on the 20% base.
        assert_eq!(investment.weekly_rate, dec!(20));
        assert_eq!(investment.max_weeks, 52);

        let user = f.store.user(user.id).await.unwrap();
        assert_eq!(user.total_invested, dec!(10000));
        let challenge = user.challenge.expect("first deposit opens the challenge");
        assert_eq!(challenge.target, dec!(50000));
        assert_eq!(challenge.deadline, now + Duration::weeks(3));
        assert_eq!(challenge.cagnotte, dec!(0));

        let opportunity = f.store.opportunity(f.opportunity).await.unwrap();
        assert_eq!(opportunity.total_invested, dec!(10000));
        assert_eq!(opportunity.active_investors, 1);
    }

    #[tokio::test]
    async fn test_level_bonus_applies_to_new_investments() {
        let f = fixture(dec!(0)).await;
        let mut user = User::new(Uuid::new_v4());
        user.level = 2;
        user.total_invested = dec!(5000);
        f.store.save_user(&user).await.unwrap();

        let investment = f
            .service
            .confirm(user.id, f.opportunity, dec!(2000), Utc::now())
            .await
            .unwrap();
        assert_eq!(investment.base_rate, dec!(20));
        assert_eq!(investment.weekly_rate, dec!(25));
    }

    #[tokio::test]
    async fn test_downline_deposit_feeds_sponsor_pot_and_signup_bonus() {
        let f = fixture(dec!(500)).await;
        let now = Utc::now();

        let mut sponsor = User::new(Uuid::new_v4());
        sponsor.total_invested = dec!(1000);
        sponsor.challenge = Some(Challenge::open(dec!(1000), 1, now, &ChallengeConfig::default()));
        f.store.save_user(&sponsor).await.unwrap();

        let member = User::referred(Uuid::new_v4(), sponsor.id);
        f.store.save_user(&member).await.unwrap();

        f.service
            .confirm(member.id, f.opportunity, dec!(2000), now)
            .await
            .unwrap();

        let sponsor = f.store.user(sponsor.id).await.unwrap();
        assert_eq!(sponsor.challenge.unwrap().cagnotte, dec!(2000));
        assert_eq!(sponsor.bonus_parrainage, dec!(500));

        let sent = f.notifier.sent_to(sponsor.id).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::ReferralBonus);

        // Second deposit: pot grows, but the sign-up bonus was a
        // first-deposit-only credit.
        f.service
            .confirm(member.id, f.opportunity, dec!(3000), now)
            .await
            .unwrap();
        let sponsor = f.store.user(sponsor.id).await.unwrap();
        assert_eq!(sponsor.challenge.unwrap().cagnotte, dec!(5000));
        assert_eq!(sponsor.bonus_parrainage, dec!(500));
        assert_eq!(f.notifier.sent_to(sponsor.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_limits_are_enforced() {
        let f = fixture(dec!(0)).await;
        let user = User::new(Uuid::new_v4());
        f.store.save_user(&user).await.unwrap();

        let below = f
            .service
            .confirm(user.id, f.opportunity, dec!(999), Utc::now())
            .await;
        assert!(matches!(below, Err(DepositError::BelowMinimum { .. })));

        let above = f
            .service
            .confirm(user.id, f.opportunity, dec!(2000000), Utc::now())
            .await;
        assert!(matches!(above, Err(DepositError::AboveMaximum { .. })));

        let zero = f
            .service
            .confirm(user.id, f.opportunity, dec!(0), Utc::now())
            .await;
        assert!(matches!(zero, Err(DepositError::NonPositiveAmount)));
    }

    #[tokio::test]
    async fn test_top_up_grows_principal_in_place() {
        let f = fixture(dec!(0)).await;
        let user = User::new(Uuid::new_v4());
        f.store.save_user(&user).await.unwrap();

        let now = Utc::now();
        let investment = f
            .service
            .confirm(user.id, f.opportunity, dec!(10000), now)
            .await
            .unwrap();

        let topped = f
            .service
            .top_up(investment.id, dec!(5000), now)
            .await
            .unwrap();
        assert_eq!(topped.amount, dec!(15000));
        assert_eq!(topped.weekly_rate, investment.weekly_rate);

        let user = f.store.user(user.id).await.unwrap();
        assert_eq!(user.total_invested, dec!(15000));
        // The top-up feeds the pot opened by the first deposit.
        assert_eq!(user.challenge.unwrap().cagnotte, dec!(5000));

        let opportunity = f.store.opportunity(f.opportunity).await.unwrap();
        assert_eq!(opportunity.total_invested, dec!(15000));
        assert_eq!(opportunity.active_investors, 1);
    }

    #[tokio::test]
    async fn test_top_up_rejected_on_terminal_investment() {
        let f = fixture(dec!(0)).await;
        let user = User::new(Uuid::new_v4());
        f.store.save_user(&user).await.unwrap();

        let now = Utc::now();
        let investment = f
            .service
            .confirm(user.id, f.opportunity, dec!(10000), now)
            .await
            .unwrap();

        // Re-read for the current version before saving the status flip.
        let mut stored = f.store.investment(investment.id).await.unwrap();
        stored.status = crate::domain::InvestmentStatus::Withdrawn;
        f.store.save_investment(&stored).await.unwrap();

        let result = f.service.top_up(investment.id, dec!(1000), now).await;
        assert!(matches!(result, Err(DepositError::NotAccruing(_))));
    }
}
