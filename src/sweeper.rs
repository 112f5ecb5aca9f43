use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tracing::{error, info, warn};

use crate::store::ComplaintStore;
use crate::window::{window_start, Clock};

/// Daily removal of settled complaints whose status has not changed within the
/// retention window.
pub struct RetentionSweeper {
    store: Arc<dyn ComplaintStore>,
    clock: Arc<dyn Clock>,
    retention_days: u32,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn ComplaintStore>, clock: Arc<dyn Clock>, retention_days: u32) -> Self {
        Self {
            store,
            clock,
            retention_days,
        }
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        window_start(self.clock.now(), self.retention_days)
    }

    pub async fn sweep_once(&self) -> anyhow::Result<u64> {
        let cutoff = self.cutoff();
        let deleted = self.store.delete_settled_before(cutoff).await?;
        info!(deleted, %cutoff, "retention sweep finished");
        Ok(deleted)
    }

    /// Runs forever. A failed sweep is logged and the next scheduled run
    /// picks up whatever was left.
    pub async fn run(self, schedule: Schedule) {
        loop {
            let now = self.clock.now();
            let Some(next) = next_run(&schedule, now) else {
                warn!("sweep schedule has no upcoming run, stopping sweeper");
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, "retention sweeper sleeping");
            tokio::time::sleep(wait).await;

            if let Err(err) = self.sweep_once().await {
                error!("retention sweep failed: {err:#}");
            }
        }
    }
}

pub fn next_run(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}
