use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use pricewatch_scraper::{CatalogError, ScrapeResult};
use rust_decimal::Decimal;
use tokio::sync::Notify;
use uuid::Uuid;

use super::*;

/// Blocks inside `run_once` until released, so tests can trigger while a run
/// is in flight.
#[derive(Default)]
struct BlockingRun {
    runs: AtomicU32,
    started: Notify,
    release: Notify,
}

#[async_trait]
impl RefreshRun for BlockingRun {
    async fn run_once(&self) -> Result<Vec<ScrapeResult>, RunError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(vec![
            ScrapeResult::recorded(Uuid::now_v7(), Decimal::TEN),
            ScrapeResult::failed(Uuid::now_v7(), "Failed to extract price"),
        ])
    }
}

/// Fails every run after counting it.
#[derive(Default)]
struct FailingRun {
    runs: AtomicU32,
}

#[async_trait]
impl RefreshRun for FailingRun {
    async fn run_once(&self) -> Result<Vec<ScrapeResult>, RunError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Err(RunError::ProductListing(CatalogError::Backend(
            "connection refused".into(),
        )))
    }
}

struct PanickingRun;

#[async_trait]
impl RefreshRun for PanickingRun {
    async fn run_once(&self) -> Result<Vec<ScrapeResult>, RunError> {
        panic!("browser handler crashed");
    }
}

struct HangingRun;

#[async_trait]
impl RefreshRun for HangingRun {
    async fn run_once(&self) -> Result<Vec<ScrapeResult>, RunError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn trigger_while_running_is_skipped_without_extra_run() {
    let runner = Arc::new(BlockingRun::default());
    let job = PriceRefreshJob::new(runner.clone(), None);

    let first = tokio::spawn({
        let job = job.clone();
        async move { job.trigger().await }
    });
    runner.started.notified().await;

    assert!(job.guard().is_running());
    assert!(matches!(job.trigger().await, TriggerOutcome::Skipped));
    assert!(matches!(job.trigger().await, TriggerOutcome::Skipped));
    assert_eq!(runner.runs.load(Ordering::SeqCst), 1);

    runner.release.notify_one();
    let outcome = first.await.expect("first trigger task");

    match outcome {
        TriggerOutcome::Completed(summary) => {
            assert_eq!(
                summary,
                RunSummary {
                    total: 2,
                    successful: 1,
                    failed: 1
                }
            );
        }
        other => panic!("expected Completed, got: {other:?}"),
    }
    assert!(!job.guard().is_running());
    assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_run_releases_guard() {
    let runner = Arc::new(FailingRun::default());
    let job = PriceRefreshJob::new(runner.clone(), None);

    assert!(matches!(
        job.trigger().await,
        TriggerOutcome::Failed(RunError::ProductListing(_))
    ));
    assert!(!job.guard().is_running());

    assert!(matches!(job.trigger().await, TriggerOutcome::Failed(_)));
    assert_eq!(runner.runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn panicking_run_releases_guard() {
    let job = PriceRefreshJob::new(Arc::new(PanickingRun), None);

    let handle = tokio::spawn({
        let job = job.clone();
        async move { job.trigger().await }
    });
    let err = handle.await.expect_err("run panics");

    assert!(err.is_panic());
    assert!(!job.guard().is_running());
}

#[tokio::test(start_paused = true)]
async fn run_exceeding_max_duration_times_out_and_releases_guard() {
    let job = PriceRefreshJob::new(Arc::new(HangingRun), Some(Duration::from_secs(30)));

    assert!(matches!(job.trigger().await, TriggerOutcome::TimedOut));
    assert!(!job.guard().is_running());
}

#[tokio::test]
async fn invalid_cron_expression_is_rejected() {
    let job = PriceRefreshJob::new(Arc::new(FailingRun::default()), None);

    let result = build_scheduler(job, "not a cron").await;

    assert!(
        matches!(
            result,
            Err(SchedulerError::InvalidSchedule { ref expression, .. }) if expression == "not a cron"
        ),
        "expected InvalidSchedule"
    );
}

#[tokio::test]
async fn schedule_validation_accepts_default_and_rejects_garbage() {
    assert!(validate_schedule("0 0 */6 * * *").is_ok());
    assert!(matches!(
        validate_schedule("every six hours"),
        Err(SchedulerError::InvalidSchedule { ref expression, .. }) if expression == "every six hours"
    ));
}

#[tokio::test]
async fn only_schedule_errors_are_reported_as_invalid_cron() {
    let err = validate_schedule("* *").expect_err("too few fields");
    assert_eq!(
        err.startup_message(),
        "invalid cron expression, scraper not started"
    );
    assert_eq!(
        SchedulerError::MissingExtractorConfig("GEMINI_MODEL").startup_message(),
        "extractor not configured, scraper not started"
    );
}
