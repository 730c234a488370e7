//! Scheduler daemon: runs the periodic engine passes.
//!
//! Drives the earnings sync job and the level-progression job on their
//! configured cadences until interrupted. Each tick captures one `now`
//! and hands it to the whole pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info};

use rendement::config::Config;
use rendement::interfaces::NotificationDispatch;
use rendement::notify::LoggingDispatch;
use rendement::services::{EarningsSyncJob, LevelProgressionJob};
use rendement::storage::init_storage;
use rendement::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;
    let store = init_storage(&config.storage).await?;
    let notifier: Arc<dyn NotificationDispatch> = Arc::new(LoggingDispatch::new());

    let sync = EarningsSyncJob::new(store.clone(), config.engine.referral.clone());
    let progression = LevelProgressionJob::new(
        store.clone(),
        notifier.clone(),
        config.engine.challenge.clone(),
    );

    info!(
        sync_interval_secs = config.scheduler.sync_interval_secs,
        progression_interval_secs = config.scheduler.progression_interval_secs,
        "Starting rendement scheduler"
    );

    let sync_period = Duration::from_secs(config.scheduler.sync_interval_secs);
    let sync_task = tokio::spawn(async move {
        let mut ticker = interval(sync_period);
        loop {
            ticker.tick().await;
            if let Err(e) = sync.run_once(Utc::now()).await {
                error!(error = %e, "Earnings sync pass failed");
            }
        }
    });

    let progression_period = Duration::from_secs(config.scheduler.progression_interval_secs);
    let progression_task = tokio::spawn(async move {
        let mut ticker = interval(progression_period);
        loop {
            ticker.tick().await;
            if let Err(e) = progression.run_once(Utc::now()).await {
                error!(error = %e, "Level progression pass failed");
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    sync_task.abort();
    progression_task.abort();
    Ok(())
}
