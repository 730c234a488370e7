//! Live commission aggregation over the referral tree.
//!
//! Read-only: these figures run ahead of the synchronized
//! `total_commissions` and are recomputed on demand for display. Nothing
//! here mutates state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::ReferralConfig;
use crate::domain::money::percent_of;
use crate::interfaces::store::{PlatformStore, StoreError};
use crate::services::accrual;

/// Computes live earnings and live referral commissions.
pub struct CommissionAggregator {
    store: Arc<dyn PlatformStore>,
    referral: ReferralConfig,
}

impl CommissionAggregator {
    pub fn new(store: Arc<dyn PlatformStore>, referral: ReferralConfig) -> Self {
        Self { store, referral }
    }

    /// Live gross earnings over `user`'s own accruing investments,
    /// including accrual past the last sync watermark.
    pub async fn live_earnings(&self, user: Uuid, now: DateTime<Utc>) -> Result<Decimal, StoreError> {
        let investments = self.store.investments_of(user).await?;
        Ok(accrual::live_earnings(&investments, now))
    }

    /// Live referral commissions: for every direct downline member `d`,
    /// the cut of `d`'s live earnings plus `d`'s own live commissions.
    ///
    /// The walk is iterative and bounded. Referral edges cannot form a
    /// cycle by construction (`referred_by` is set once at registration),
    /// but the depth cap and the visited set still hold the line if the
    /// data is ever corrupted: descendants past `max_depth` contribute
    /// nothing, and a repeated node is walked once.
    pub async fn live_commissions(
        &self,
        user: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Decimal, StoreError> {
        let mut visited: HashSet<Uuid> = HashSet::new();
        visited.insert(user);

        // Collect the tree level by level, remembering each node's
        // collected children for the fold below.
        let mut levels: Vec<Vec<Uuid>> = Vec::new();
        let mut children_of: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

        let mut frontier = self.store.direct_downline(user).await?;
        frontier.retain(|d| visited.insert(d.id));
        let direct: Vec<Uuid> = frontier.iter().map(|d| d.id).collect();

        let mut depth = 0;
        while !frontier.is_empty() && depth < self.referral.max_depth {
            let mut next = Vec::new();
            for node in &frontier {
                let mut children = self.store.direct_downline(node.id).await?;
                children.retain(|c| visited.insert(c.id));
                children_of.insert(node.id, children.iter().map(|c| c.id).collect());
                next.extend(children);
            }
            levels.push(frontier.iter().map(|n| n.id).collect());
            frontier = next;
            depth += 1;
        }

        // Fold deepest level first so every node's sub-commissions are
        // known before its own contribution is taken.
        let mut contribution: HashMap<Uuid, Decimal> = HashMap::new();
        for level in levels.iter().rev() {
            for node in level {
                let earnings = self.live_earnings(*node, now).await?;
                let sub: Decimal = children_of
                    .get(node)
                    .into_iter()
                    .flatten()
                    .filter_map(|child| contribution.get(child))
                    .copied()
                    .sum();
                contribution.insert(
                    *node,
                    percent_of(earnings + sub, self.referral.commission_cut),
                );
            }
        }

        Ok(direct
            .iter()
            .filter_map(|d| contribution.get(d))
            .copied()
            .sum())
    }
}
