//! Scheduler cadence configuration.

use serde::Deserialize;

/// How often the periodic jobs run.
///
/// Both jobs are idempotent at any cadence; these values only trade
/// balance freshness against database load.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between earnings sync passes.
    pub sync_interval_secs: u64,
    /// Seconds between level-progression deadline checks.
    pub progression_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: 300,
            progression_interval_secs: 600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_defaults() {
        let scheduler = SchedulerConfig::default();
        assert_eq!(scheduler.sync_interval_secs, 300);
        assert_eq!(scheduler.progression_interval_secs, 600);
    }
}
