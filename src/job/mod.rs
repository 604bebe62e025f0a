//! Single-flight digest runs: aggregate, curate, deliver, and track the last outcome.

pub mod schedule;
pub mod scheduler;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::category::Category;
use crate::curate::{CurationResult, Curator};
use crate::error::{PipelineError, SourceFailure};
use crate::ingest::Aggregator;
use crate::notify::DigestNotifier;

pub use schedule::DailySchedule;
pub use scheduler::spawn_daily_scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Initialized,
    Running,
    Success,
    Failed,
}

/// Process-local record of the last run. Callers always receive a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub last_run: Option<DateTime<Utc>>,
    pub state: JobState,
    pub item_count: usize,
    pub next_run: DateTime<Utc>,
    pub last_error: Option<String>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Manual,
    Scheduled,
}

impl Trigger {
    fn as_str(self) -> &'static str {
        match self {
            Trigger::Manual => "manual",
            Trigger::Scheduled => "scheduled",
        }
    }
}

/// Pipeline output without delivery.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    #[serde(rename = "type")]
    pub category: Category,
    pub generated_at: DateTime<Utc>,
    pub scraped_count: usize,
    pub selected_count: usize,
    pub source_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SourceFailure>,
    #[serde(flatten)]
    pub result: CurationResult,
}

pub struct Orchestrator {
    aggregator: Aggregator,
    curator: Curator,
    notifier: Arc<dyn DigestNotifier>,
    max_output: usize,
    schedule: DailySchedule,
    status: Mutex<JobStatus>,
}

impl Orchestrator {
    pub fn new(
        aggregator: Aggregator,
        curator: Curator,
        notifier: Arc<dyn DigestNotifier>,
        max_output: usize,
        schedule: DailySchedule,
    ) -> Self {
        let status = JobStatus {
            last_run: None,
            state: JobState::Initialized,
            item_count: 0,
            next_run: schedule.next_after(Utc::now()),
            last_error: None,
            category: None,
        };
        Self {
            aggregator,
            curator,
            notifier,
            max_output,
            schedule,
            status: Mutex::new(status),
        }
    }

    pub fn schedule(&self) -> DailySchedule {
        self.schedule
    }

    pub fn notifier(&self) -> &Arc<dyn DigestNotifier> {
        &self.notifier
    }

    fn lock(&self) -> MutexGuard<'_, JobStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> JobStatus {
        self.lock().clone()
    }

    /// Single-flight check and claim, atomically under the status lock.
    fn claim(&self, category: Category) -> Result<(), PipelineError> {
        let mut st = self.lock();
        if st.state == JobState::Running {
            return Err(PipelineError::AlreadyRunning);
        }
        st.state = JobState::Running;
        st.last_error = None;
        st.category = Some(category);
        Ok(())
    }

    /// Claim the slot now, run in the background. Outcome is observed via `status()`.
    pub fn trigger_run(self: &Arc<Self>, category: Category) -> Result<(), PipelineError> {
        self.claim(category)?;
        info!(target: "job", %category, "manual run accepted");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            // errors are already recorded in the status
            let _ = this.execute(category, Trigger::Manual).await;
        });
        Ok(())
    }

    /// Manual run awaited in place; the caller gets the error directly.
    pub async fn run_manual(&self, category: Category) -> Result<CurationResult, PipelineError> {
        self.claim(category)?;
        self.execute(category, Trigger::Manual).await
    }

    /// Timer path: on failure sends a best-effort notice; always recomputes `next_run`.
    pub async fn run_scheduled(&self, category: Category) -> Result<(), PipelineError> {
        let outcome = match self.claim(category) {
            Ok(()) => self.execute(category, Trigger::Scheduled).await.map(|_| ()),
            Err(e) => {
                warn!(target: "job", %category, "scheduled run skipped: a run is in progress");
                Err(e)
            }
        };

        if let Err(e) = &outcome {
            if !matches!(e, PipelineError::AlreadyRunning) {
                self.send_failure_notice(category, e).await;
            }
        }

        self.record_next_run(self.schedule.next_after(Utc::now()));
        outcome
    }

    fn record_next_run(&self, next: DateTime<Utc>) {
        self.lock().next_run = next;
        info!(target: "job", next_run = %next, "next scheduled run");
    }

    async fn send_failure_notice(&self, category: Category, err: &PipelineError) {
        let at = Utc::now().with_timezone(&self.schedule.zone());
        let text = format!(
            "❌ **News Bot Error**\n\nScheduled job failed at {}\n\nError: {err}",
            at.format("%Y-%m-%d %H:%M:%S %:z")
        );
        if let Err(notice_err) = self.notifier.send_text(category, &text).await {
            error!(target: "job", error = %notice_err, "failed to deliver failure notice");
        }
    }

    /// Aggregate and curate; no delivery and no status changes.
    pub async fn fetch_preview(&self, category: Category) -> Result<Preview, PipelineError> {
        let agg = self.aggregator.aggregate_by_category(category).await?;
        let scraped_count = agg.items.len();
        let result = self
            .curator
            .curate(agg.items, category, self.max_output)
            .await?;
        Ok(Preview {
            category,
            generated_at: Utc::now(),
            scraped_count,
            selected_count: result.items.len(),
            source_count: agg.source_count,
            failures: agg.failures,
            result,
        })
    }

    async fn execute(
        &self,
        category: Category,
        trigger: Trigger,
    ) -> Result<CurationResult, PipelineError> {
        let guard = RunGuard::new(&self.status);
        info!(target: "job", %category, trigger = trigger.as_str(), "news job started");

        let curated = async {
            let agg = self.aggregator.aggregate_by_category(category).await?;
            self.curator
                .curate(agg.items, category, self.max_output)
                .await
        }
        .await;

        let (outcome, item_count) = match curated {
            Err(e) => (Err(e), 0),
            Ok(digest) => {
                let count = digest.items.len();
                match self.notifier.send_digest(category, &digest).await {
                    Ok(()) => (Ok(digest), count),
                    Err(e) => (Err(PipelineError::external("delivery", &e)), count),
                }
            }
        };

        match &outcome {
            Ok(_) => {
                counter!("digest_runs_total", "outcome" => "success").increment(1);
                info!(target: "job", %category, items = item_count, "news job completed");
                guard.finish(JobState::Success, item_count, None);
            }
            Err(e) => {
                counter!("digest_runs_total", "outcome" => "failed").increment(1);
                error!(
                    target: "job",
                    %category,
                    trigger = trigger.as_str(),
                    kind = e.kind(),
                    error = %e,
                    "news job failed"
                );
                guard.finish(JobState::Failed, item_count, Some(e.to_string()));
            }
        }
        outcome
    }
}

/// Ends a claimed run. Dropped without `finish` (task aborted or panicked) it marks the
/// run failed so the slot is never left `running`.
struct RunGuard<'a> {
    status: &'a Mutex<JobStatus>,
    done: bool,
}

impl<'a> RunGuard<'a> {
    fn new(status: &'a Mutex<JobStatus>) -> Self {
        Self {
            status,
            done: false,
        }
    }

    fn finish(mut self, state: JobState, item_count: usize, last_error: Option<String>) {
        self.record(state, item_count, last_error);
        self.done = true;
    }

    fn record(&self, state: JobState, item_count: usize, last_error: Option<String>) {
        let mut st = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        st.state = state;
        st.item_count = item_count;
        st.last_error = last_error;
        st.last_run = Some(Utc::now());
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.record(JobState::Failed, 0, Some("run aborted".to_string()));
        }
    }
}
