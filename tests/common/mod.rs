//! Shared utilities for integration tests.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use rendement::config::EngineConfig;
use rendement::domain::{Opportunity, User};
use rendement::interfaces::PlatformStore;
use rendement::notify::RecordingDispatch;
use rendement::services::DepositService;
use rendement::storage::MemoryStore;

/// A wired-up engine over an in-memory store.
pub struct TestPlatform {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingDispatch>,
    pub deposits: DepositService,
    pub engine: EngineConfig,
    pub opportunity: Uuid,
}

/// Build a platform with one opportunity at `base_rate` percent per week.
pub async fn platform(base_rate: Decimal, engine: EngineConfig) -> TestPlatform {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingDispatch::new());

    let opportunity = Opportunity::new(
        Uuid::new_v4(),
        "Cacao lot",
        base_rate,
        dec!(500),
        dec!(10000000),
        52,
    );
    let opportunity_id = opportunity.id;
    store.save_opportunity(&opportunity).await.unwrap();

    let deposits = DepositService::new(store.clone(), notifier.clone(), engine.clone());
    TestPlatform {
        store,
        notifier,
        deposits,
        engine,
        opportunity: opportunity_id,
    }
}

/// Register a user, optionally under a sponsor.
pub async fn register(store: &MemoryStore, sponsor: Option<Uuid>) -> Uuid {
    let user = match sponsor {
        Some(sponsor_id) => {
            let user = User::referred(Uuid::new_v4(), sponsor_id);
            let mut upline = store.user(sponsor_id).await.unwrap();
            upline.referrals.push(user.id);
            store.save_user(&upline).await.unwrap();
            user
        }
        None => User::new(Uuid::new_v4()),
    };
    let id = user.id;
    store.save_user(&user).await.unwrap();
    id
}
