//! In-memory store.
//!
//! Always compiled in: it backs the test suite and is the default
//! storage for local development. Batch methods take all their locks in
//! one critical section, which gives the same atomicity the SQLite
//! store gets from transactions. Lock order is investments, users,
//! opportunities throughout.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    Investment, Opportunity, User, Withdrawal, WithdrawalKind, WithdrawalStatus,
};
use crate::interfaces::store::{PlatformStore, Result, StoreError};

/// In-memory implementation of [`PlatformStore`].
#[derive(Default)]
pub struct MemoryStore {
    investments: RwLock<HashMap<Uuid, Investment>>,
    users: RwLock<HashMap<Uuid, User>>,
    opportunities: RwLock<HashMap<Uuid, Opportunity>>,
    withdrawals: RwLock<Vec<Withdrawal>>,
    fail_on_save: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, to test batch-failure handling.
    pub async fn set_fail_on_save(&self, fail: bool) {
        *self.fail_on_save.write().await = fail;
    }

    async fn check_write_allowed(&self) -> Result<()> {
        if *self.fail_on_save.read().await {
            return Err(StoreError::Backend("injected save failure".to_string()));
        }
        Ok(())
    }

    fn store_investment(
        investments: &mut HashMap<Uuid, Investment>,
        investment: &Investment,
    ) -> Result<()> {
        if let Some(stored) = investments.get(&investment.id) {
            if stored.version != investment.version {
                return Err(StoreError::VersionConflict {
                    id: investment.id,
                    stored: stored.version,
                    submitted: investment.version,
                });
            }
        }
        let mut fresh = investment.clone();
        fresh.version += 1;
        investments.insert(fresh.id, fresh);
        Ok(())
    }
}

#[async_trait]
impl PlatformStore for MemoryStore {
    async fn user(&self, id: Uuid) -> Result<User> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::UserNotFound(id))
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        self.check_write_allowed().await?;
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }

    async fn save_users(&self, users: &[User]) -> Result<()> {
        self.check_write_allowed().await?;
        let mut store = self.users.write().await;
        for user in users {
            store.insert(user.id, user.clone());
        }
        Ok(())
    }

    async fn users(&self) -> Result<Vec<User>> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn investment(&self, id: Uuid) -> Result<Investment> {
        self.investments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::InvestmentNotFound(id))
    }

    async fn save_investment(&self, investment: &Investment) -> Result<()> {
        self.check_write_allowed().await?;
        let mut investments = self.investments.write().await;
        Self::store_investment(&mut investments, investment)
    }

    async fn active_investments(&self) -> Result<Vec<Investment>> {
        Ok(self
            .investments
            .read()
            .await
            .values()
            .filter(|inv| inv.accrues())
            .cloned()
            .collect())
    }

    async fn investments_of(&self, owner: Uuid) -> Result<Vec<Investment>> {
        Ok(self
            .investments
            .read()
            .await
            .values()
            .filter(|inv| inv.owner == owner)
            .cloned()
            .collect())
    }

    async fn opportunity(&self, id: Uuid) -> Result<Opportunity> {
        self.opportunities
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::OpportunityNotFound(id))
    }

    async fn save_opportunity(&self, opportunity: &Opportunity) -> Result<()> {
        self.check_write_allowed().await?;
        self.opportunities
            .write()
            .await
            .insert(opportunity.id, opportunity.clone());
        Ok(())
    }

    async fn persist_distribution(&self, investment: &Investment, users: &[User]) -> Result<()> {
        self.check_write_allowed().await?;
        let mut investments = self.investments.write().await;
        let mut user_store = self.users.write().await;

        Self::store_investment(&mut investments, investment)?;
        for user in users {
            user_store.insert(user.id, user.clone());
        }
        Ok(())
    }

    async fn persist_deposit(
        &self,
        investment: &Investment,
        users: &[User],
        opportunity: &Opportunity,
    ) -> Result<()> {
        self.check_write_allowed().await?;
        let mut investments = self.investments.write().await;
        let mut user_store = self.users.write().await;
        let mut opportunities = self.opportunities.write().await;

        Self::store_investment(&mut investments, investment)?;
        for user in users {
            user_store.insert(user.id, user.clone());
        }
        opportunities.insert(opportunity.id, opportunity.clone());
        Ok(())
    }

    async fn users_past_deadline(&self, as_of: DateTime<Utc>) -> Result<Vec<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|user| {
                !user.benefits_blocked
                    && user.total_invested > Decimal::ZERO
                    && user
                        .challenge
                        .as_ref()
                        .is_some_and(|challenge| challenge.deadline <= as_of)
            })
            .cloned()
            .collect())
    }

    async fn direct_downline(&self, sponsor: Uuid) -> Result<Vec<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|user| user.referred_by == Some(sponsor))
            .cloned()
            .collect())
    }

    async fn record_withdrawal(&self, withdrawal: &Withdrawal) -> Result<()> {
        self.check_write_allowed().await?;
        self.withdrawals.write().await.push(withdrawal.clone());
        Ok(())
    }

    async fn withdrawn_gains(&self, user: Uuid) -> Result<Decimal> {
        Ok(self
            .withdrawals
            .read()
            .await
            .iter()
            .filter(|w| {
                w.user == user
                    && w.kind == WithdrawalKind::Gains
                    && w.status == WithdrawalStatus::Completed
            })
            .map(|w| w.amount)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::ChallengeConfig;
    use crate::domain::Challenge;

    fn investment(owner: Uuid) -> Investment {
        Investment::new(
            Uuid::new_v4(),
            owner,
            Uuid::new_v4(),
            dec!(1000),
            dec!(10),
            dec!(10),
            52,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_save_investment_bumps_version() {
        let store = MemoryStore::new();
        let inv = investment(Uuid::new_v4());
        store.save_investment(&inv).await.unwrap();

        let stored = store.investment(inv.id).await.unwrap();
        assert_eq!(stored.version, 1);

        store.save_investment(&stored).await.unwrap();
        assert_eq!(store.investment(inv.id).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let store = MemoryStore::new();
        let inv = investment(Uuid::new_v4());
        store.save_investment(&inv).await.unwrap();

        let fresh = store.investment(inv.id).await.unwrap();
        store.save_investment(&fresh).await.unwrap();

        // `fresh` is stale now.
        let result = store.save_investment(&fresh).await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));

        // Re-read and retry succeeds.
        let current = store.investment(inv.id).await.unwrap();
        store.save_investment(&current).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_distribution_writes_nothing() {
        let store = MemoryStore::new();
        let mut user = User::new(Uuid::new_v4());
        store.save_user(&user).await.unwrap();
        let inv = investment(user.id);
        store.save_investment(&inv).await.unwrap();

        user.credit_personal(dec!(100));
        // Stale investment version: the whole unit must be rejected.
        let result = store.persist_distribution(&inv, &[user.clone()]).await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
        assert_eq!(store.user(user.id).await.unwrap().balance, dec!(0));
    }

    #[tokio::test]
    async fn test_users_past_deadline_filters() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let config = ChallengeConfig::default();

        let mut due = User::new(Uuid::new_v4());
        due.total_invested = dec!(100);
        due.challenge = Some(Challenge::open(dec!(100), 1, now - Duration::weeks(4), &config));
        store.save_user(&due).await.unwrap();

        let mut pending = User::new(Uuid::new_v4());
        pending.total_invested = dec!(100);
        pending.challenge = Some(Challenge::open(dec!(100), 1, now, &config));
        store.save_user(&pending).await.unwrap();

        let mut blocked = User::new(Uuid::new_v4());
        blocked.total_invested = dec!(100);
        blocked.benefits_blocked = true;
        blocked.challenge = Some(Challenge::open(dec!(100), 1, now - Duration::weeks(4), &config));
        store.save_user(&blocked).await.unwrap();

        let never_deposited = User::new(Uuid::new_v4());
        store.save_user(&never_deposited).await.unwrap();

        let past = store.users_past_deadline(now).await.unwrap();
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].id, due.id);
    }

    #[tokio::test]
    async fn test_direct_downline_query() {
        let store = MemoryStore::new();
        let sponsor = User::new(Uuid::new_v4());
        store.save_user(&sponsor).await.unwrap();

        for _ in 0..2 {
            let child = User::referred(Uuid::new_v4(), sponsor.id);
            store.save_user(&child).await.unwrap();
        }
        let unrelated = User::new(Uuid::new_v4());
        store.save_user(&unrelated).await.unwrap();

        assert_eq!(store.direct_downline(sponsor.id).await.unwrap().len(), 2);
        assert!(store.direct_downline(unrelated.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_withdrawn_gains_counts_only_completed_gains() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();

        store
            .record_withdrawal(&Withdrawal::completed(
                Uuid::new_v4(),
                user,
                dec!(300),
                WithdrawalKind::Gains,
                now,
            ))
            .await
            .unwrap();
        store
            .record_withdrawal(&Withdrawal::completed(
                Uuid::new_v4(),
                user,
                dec!(5000),
                WithdrawalKind::Capital,
                now,
            ))
            .await
            .unwrap();
        let mut pending = Withdrawal::completed(
            Uuid::new_v4(),
            user,
            dec!(200),
            WithdrawalKind::Gains,
            now,
        );
        pending.status = WithdrawalStatus::Pending;
        store.record_withdrawal(&pending).await.unwrap();

        assert_eq!(store.withdrawn_gains(user).await.unwrap(), dec!(300));
    }
}
