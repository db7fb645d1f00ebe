//! The scheduled price-refresh job.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pricewatch_scraper::{RefreshRun, RunError, RunSummary};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::guard::RunGuard;
use crate::SchedulerError;

/// What happened when the job was triggered.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// Another run held the guard; nothing was started.
    Skipped,
    Completed(RunSummary),
    Failed(RunError),
    /// The run exceeded the configured maximum duration and was abandoned.
    TimedOut,
}

/// Runs refreshes under a [`RunGuard`], logging run statistics.
#[derive(Clone)]
pub struct PriceRefreshJob {
    runner: Arc<dyn RefreshRun>,
    guard: RunGuard,
    max_run: Option<Duration>,
}

impl PriceRefreshJob {
    #[must_use]
    pub fn new(runner: Arc<dyn RefreshRun>, max_run: Option<Duration>) -> Self {
        Self {
            runner,
            guard: RunGuard::new(),
            max_run,
        }
    }

    #[must_use]
    pub fn guard(&self) -> &RunGuard {
        &self.guard
    }

    /// Starts a run unless one is already in flight.
    ///
    /// The guard is released on every exit path, including cancellation of
    /// the returned future and a panic inside the run.
    pub async fn trigger(&self) -> TriggerOutcome {
        let Some(_permit) = self.guard.try_acquire() else {
            tracing::warn!("task already running, skipping this execution");
            return TriggerOutcome::Skipped;
        };

        let start = Instant::now();
        tracing::info!("starting task");

        let outcome = match self.max_run {
            Some(limit) => match tokio::time::timeout(limit, self.runner.run_once()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!(
                        max_run_secs = limit.as_secs(),
                        "task exceeded maximum run time and was cancelled"
                    );
                    return TriggerOutcome::TimedOut;
                }
            },
            None => self.runner.run_once().await,
        };

        match outcome {
            Ok(results) => {
                let summary = RunSummary::from_results(&results);
                tracing::info!(
                    duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    total = summary.total,
                    successful = summary.successful,
                    failed = summary.failed,
                    "task completed"
                );
                TriggerOutcome::Completed(summary)
            }
            Err(e) => {
                tracing::error!(error = %e, "task failed");
                TriggerOutcome::Failed(e)
            }
        }
    }
}

/// Registers `job` on a new [`JobScheduler`] with the given cron expression
/// and starts it.
///
/// Returns the running scheduler; call `shutdown` on it to stop triggering.
///
/// # Errors
///
/// - [`SchedulerError::InvalidSchedule`] if `cron_expression` does not parse.
/// - [`SchedulerError::Scheduler`] if the scheduler cannot be created or started.
pub async fn build_scheduler(
    job: PriceRefreshJob,
    cron_expression: &str,
) -> Result<JobScheduler, SchedulerError> {
    let cron_job = Job::new_async(cron_expression, move |_uuid, _lock| {
        let job = job.clone();
        Box::pin(async move {
            job.trigger().await;
        })
    })
    .map_err(|source| invalid_schedule(cron_expression, source))?;

    let scheduler = JobScheduler::new().await?;
    scheduler.add(cron_job).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Checks that `cron_expression` parses, without creating a scheduler.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidSchedule`] if the expression is rejected.
pub fn validate_schedule(cron_expression: &str) -> Result<(), SchedulerError> {
    Job::new_async(cron_expression, |_uuid, _lock| Box::pin(async {}))
        .map(|_| ())
        .map_err(|source| invalid_schedule(cron_expression, source))
}

fn invalid_schedule(expression: &str, source: JobSchedulerError) -> SchedulerError {
    SchedulerError::InvalidSchedule {
        expression: expression.to_owned(),
        source,
    }
}

#[cfg(test)]
#[path = "job_test.rs"]
mod tests;
