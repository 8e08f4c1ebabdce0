//! Periodic backup production.
//!
//! Runs one background task per enabled cadence. Each tick captures a
//! snapshot through [`BackupCommand::create_snapshot`]; failures are logged
//! and the task waits for the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::domain::BackupKind;
use crate::domain::ports::BackupCommand;

/// Source recorded for scheduled backups.
pub const SCHEDULER_BACKUP_SOURCE: &str = "scheduler";

/// How often each kind of periodic backup runs. `None` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupCadence {
    /// Period of `hourly` backups.
    pub hourly: Option<Duration>,
    /// Period of `daily` backups.
    pub daily: Option<Duration>,
}

impl BackupCadence {
    /// Build a cadence from minute and hour counts, treating zero as disabled.
    pub fn from_intervals(hourly_minutes: u64, daily_hours: u64) -> Self {
        let period = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        Self {
            hourly: period(hourly_minutes.saturating_mul(60)),
            daily: period(daily_hours.saturating_mul(3_600)),
        }
    }
}

impl Default for BackupCadence {
    fn default() -> Self {
        Self::from_intervals(60, 24)
    }
}

/// Spawns the periodic backup tasks.
pub struct BackupScheduler {
    command: Arc<dyn BackupCommand>,
    cadence: BackupCadence,
}

impl BackupScheduler {
    /// Create a scheduler for the given backup command.
    pub fn new(command: Arc<dyn BackupCommand>, cadence: BackupCadence) -> Self {
        Self { command, cadence }
    }

    /// Start the background tasks on the current Tokio runtime.
    ///
    /// The first backup of each kind is taken one full period after start.
    pub fn spawn(self) -> BackupSchedulerHandle {
        let schedule = [
            (BackupKind::Hourly, self.cadence.hourly),
            (BackupKind::Daily, self.cadence.daily),
        ];
        let tasks = schedule
            .into_iter()
            .filter_map(|(kind, period)| period.map(|period| (kind, period)))
            .map(|(kind, period)| {
                info!(kind = kind.as_str(), period_secs = period.as_secs(), "scheduling backups");
                tokio::spawn(run_cadence(Arc::clone(&self.command), kind, period))
            })
            .collect();
        BackupSchedulerHandle { tasks }
    }
}

async fn run_cadence(command: Arc<dyn BackupCommand>, kind: BackupKind, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match command.create_snapshot(kind, SCHEDULER_BACKUP_SOURCE).await {
            Ok(backup) => info!(backup_id = %backup.id, kind = kind.as_str(), "scheduled backup taken"),
            Err(error) => warn!(%error, kind = kind.as_str(), "scheduled backup failed"),
        }
    }
}

/// Owns the running backup tasks; dropping it stops them.
#[derive(Debug)]
pub struct BackupSchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl BackupSchedulerHandle {
    /// Number of running cadences.
    pub fn cadences(&self) -> usize {
        self.tasks.len()
    }

    /// Stop every backup task.
    pub fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for BackupSchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
