use crate::utils::error::{PagesError, Result};
use crate::workflow::runner::WorkflowRunner;
use crate::workflow::schedule::CronSchedule;
use crate::workflow::trigger::TriggerKind;
use chrono::{DateTime, Utc};
use std::future::Future;

/// Fires the workflow on a cron schedule, one run at a time.
///
/// The next fire time is computed after each run finishes, so ticks that
/// pass while a run is still going are dropped rather than queued.
pub struct Scheduler {
    runner: WorkflowRunner,
    schedule: CronSchedule,
    run_on_start: bool,
    max_runs: Option<usize>,
}

impl Scheduler {
    pub fn new(runner: WorkflowRunner, schedule: CronSchedule) -> Self {
        Self {
            runner,
            schedule,
            run_on_start: false,
            max_runs: None,
        }
    }

    pub fn run_on_start(mut self, enabled: bool) -> Self {
        self.run_on_start = enabled;
        self
    }

    pub fn max_runs(mut self, max_runs: Option<usize>) -> Self {
        self.max_runs = max_runs;
        self
    }

    fn exhausted(&self, runs: usize) -> bool {
        self.max_runs.is_some_and(|max| runs >= max)
    }

    /// Runs until `shutdown` resolves or `max_runs` ticks have fired. Returns the
    /// number of ticks fired, including ticks skipped because a run held the lock.
    pub async fn run_until<F: Future<Output = ()>>(self, shutdown: F) -> Result<usize> {
        tokio::pin!(shutdown);
        let mut runs = 0;

        tracing::info!("⏰ Scheduler started with '{}' (UTC)", self.schedule);

        if self.run_on_start && !self.exhausted(runs) {
            self.tick(TriggerKind::Schedule {
                scheduled_for: Utc::now(),
            })
            .await;
            runs += 1;
        }

        let mut last_fired: Option<DateTime<Utc>> = None;
        while !self.exhausted(runs) {
            let now = Utc::now();
            // Never fire the same minute twice if the timer wakes early.
            let from = last_fired.map_or(now, |last| now.max(last));
            let next = self
                .schedule
                .next_after(from)
                .ok_or_else(|| PagesError::ScheduleError {
                    expression: self.schedule.to_string(),
                    reason: "the schedule never fires".to_string(),
                })?;
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!("Next run at {}", next.format("%Y-%m-%d %H:%M UTC"));

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            self.tick(TriggerKind::Schedule { scheduled_for: next }).await;
            last_fired = Some(next);
            runs += 1;
        }

        Ok(runs)
    }

    async fn tick(&self, trigger: TriggerKind) {
        match self.runner.dispatch(trigger).await {
            Ok(report) => tracing::info!(
                "Run finished: {} steps succeeded in {:.1?}",
                report.steps.len(),
                report.duration()
            ),
            Err(PagesError::RunInProgress { lock_path }) => {
                tracing::warn!("Skipping tick, another run holds {}", lock_path)
            }
            Err(e) => tracing::error!("Scheduled run failed: {}", e),
        }
    }
}
