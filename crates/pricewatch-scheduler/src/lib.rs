pub mod catalog;
pub mod guard;
pub mod job;

pub use catalog::PgCatalog;
pub use guard::{RunGuard, RunPermit};
pub use job::{build_scheduler, validate_schedule, PriceRefreshJob, TriggerOutcome};

use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("{0} not set, scraper not started")]
    MissingExtractorConfig(&'static str),

    #[error("invalid cron expression \"{expression}\": {source}")]
    InvalidSchedule {
        expression: String,
        #[source]
        source: JobSchedulerError,
    },

    #[error("scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),
}

impl SchedulerError {
    /// Log line for a startup failure caused by this error.
    #[must_use]
    pub fn startup_message(&self) -> &'static str {
        match self {
            SchedulerError::MissingExtractorConfig(_) => {
                "extractor not configured, scraper not started"
            }
            SchedulerError::InvalidSchedule { .. } => "invalid cron expression, scraper not started",
            SchedulerError::Scheduler(_) => "failed to start scheduler",
        }
    }
}
