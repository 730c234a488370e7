//! Level progression: deadline checks, promotion, blocking.
//!
//! Each user with deposits runs a deadline-boxed deposit challenge. This
//! job is the periodic deadline check: it promotes users whose pot
//! reached the target and blocks the rest. One `now` is captured per
//! pass and threaded through every evaluation, so two users with the
//! same deadline are always treated consistently within a pass.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::ChallengeConfig;
use crate::domain::{Challenge, User};
use crate::interfaces::notifier::{NotificationDispatch, NotificationKind};
use crate::interfaces::store::{PlatformStore, StoreError};

/// Totals from one deadline-check pass.
#[derive(Debug, Clone, Default)]
pub struct ProgressionReport {
    pub examined: usize,
    pub promoted: usize,
    pub blocked: usize,
    pub failures: usize,
}

/// Periodic challenge deadline check.
pub struct LevelProgressionJob {
    store: Arc<dyn PlatformStore>,
    notifier: Arc<dyn NotificationDispatch>,
    config: ChallengeConfig,
    pass_lock: Arc<Mutex<()>>,
}

impl LevelProgressionJob {
    pub fn new(
        store: Arc<dyn PlatformStore>,
        notifier: Arc<dyn NotificationDispatch>,
        config: ChallengeConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
            pass_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run one deadline check over every due user, all evaluated at the
    /// same `now`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<ProgressionReport, StoreError> {
        let _pass = self.pass_lock.lock().await;

        let due = self.store.users_past_deadline(now).await?;
        let mut report = ProgressionReport {
            examined: due.len(),
            ..ProgressionReport::default()
        };

        for mut user in due {
            match self.check_one(&mut user, now).await {
                Ok(Verdict::Promoted) => report.promoted += 1,
                Ok(Verdict::Blocked) => report.blocked += 1,
                Ok(Verdict::NotDue) => {}
                Err(e) => {
                    warn!(user = %user.id, error = %e, "Deadline check failed, continuing");
                    report.failures += 1;
                }
            }
        }

        info!(
            examined = report.examined,
            promoted = report.promoted,
            blocked = report.blocked,
            failures = report.failures,
            "Level progression pass complete"
        );
        Ok(report)
    }

    async fn check_one(&self, user: &mut User, now: DateTime<Utc>) -> Result<Verdict, StoreError> {
        // The store query already filters, but the record may have moved
        // under us since the snapshot was taken.
        let Some(challenge) = user.challenge.clone() else {
            return Ok(Verdict::NotDue);
        };
        if challenge.deadline > now || user.benefits_blocked {
            return Ok(Verdict::NotDue);
        }

        if challenge.reached() {
            self.promote(user, &challenge, now).await?;
            Ok(Verdict::Promoted)
        } else {
            self.block(user, &challenge).await?;
            Ok(Verdict::Blocked)
        }
    }

    async fn promote(
        &self,
        user: &mut User,
        challenge: &Challenge,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        user.level += 1;
        user.challenge = if user.level >= self.config.max_level {
            // Top tier: no further deadline checks apply.
            None
        } else {
            Some(Challenge::open(
                challenge.qualifying_deposit,
                user.level,
                now,
                &self.config,
            ))
        };
        self.store.save_user(user).await?;

        info!(user = %user.id, level = user.level, "User promoted");
        let params = json!({
            "level": user.level,
            "cagnotte": challenge.cagnotte,
            "target": challenge.target,
        });
        if let Err(e) = self
            .notifier
            .notify(user.id, NotificationKind::LevelPromoted, params)
            .await
        {
            warn!(user = %user.id, error = %e, "Promotion notification failed");
        }
        Ok(())
    }

    async fn block(&self, user: &mut User, challenge: &Challenge) -> Result<(), StoreError> {
        user.benefits_blocked = true;
        user.challenge = None;
        self.store.save_user(user).await?;

        info!(user = %user.id, "Challenge failed, personal earnings blocked");
        let params = json!({
            "cagnotte": challenge.cagnotte,
            "target": challenge.target,
        });
        if let Err(e) = self
            .notifier
            .notify(user.id, NotificationKind::ChallengeFailed, params)
            .await
        {
            warn!(user = %user.id, error = %e, "Block notification failed");
        }
        Ok(())
    }
}

enum Verdict {
    Promoted,
    Blocked,
    NotDue,
}
