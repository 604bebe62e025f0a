// src/job/scheduler.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use super::{DailySchedule, Orchestrator};
use crate::category::Category;

/// Run every category in `categories`, one after another, at each daily slot.
/// Wire this from app startup; the handle can be aborted on shutdown.
pub fn spawn_daily_scheduler(orch: Arc<Orchestrator>, categories: Vec<Category>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let schedule = orch.schedule();
        tracing::info!(
            target: "job",
            schedule = %schedule.describe(),
            categories = ?categories,
            "daily scheduler started"
        );
        let mut slot = schedule.next_after(Utc::now());
        loop {
            let wait = (slot - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            for &category in &categories {
                if let Err(e) = orch.run_scheduled(category).await {
                    tracing::warn!(target: "job", %category, error = %e, "scheduled run failed");
                }
            }
            slot = following_slot(&schedule, slot, Utc::now());
            orch.record_next_run(slot);
        }
    })
}

/// The slot after `fired`. Chained from the slot itself, so waking slightly early on the
/// monotonic clock never fires the same slot twice; slots missed while runs overran are
/// skipped.
fn following_slot(schedule: &DailySchedule, fired: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    schedule.next_after(fired.max(now))
}
