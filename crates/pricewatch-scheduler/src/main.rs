use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pricewatch_scheduler::{
    build_scheduler, validate_schedule, PgCatalog, PriceRefreshJob, SchedulerError,
};
use pricewatch_scraper::{ChromiumLauncher, FixedDelay, GeminiClient, Orchestrator, PriceExtractor};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricewatch-scheduler", about = "Periodically refreshes tracked product prices")]
struct Cli {
    /// Trigger one refresh immediately after startup, then keep the schedule.
    #[arg(long)]
    run_now: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = pricewatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        env = %config.env,
        cron = %config.cron_expression,
        "starting scheduler"
    );

    let api_key = config.gemini_api_key.as_deref().ok_or_else(|| {
        tracing::warn!("GEMINI_API_KEY not set, scraper not started");
        SchedulerError::MissingExtractorConfig("GEMINI_API_KEY")
    })?;
    let model = config.gemini_model.as_deref().ok_or_else(|| {
        tracing::warn!("GEMINI_MODEL not set, scraper not started");
        SchedulerError::MissingExtractorConfig("GEMINI_MODEL")
    })?;

    if let Err(e) = validate_schedule(&config.cron_expression) {
        tracing::error!(
            cron_expression = %config.cron_expression,
            error = %e,
            "{}",
            e.startup_message()
        );
        return Err(e.into());
    }

    let pool_config = pricewatch_db::PoolConfig::from_app_config(&config);
    let pool = pricewatch_db::connect_pool(&config.database_url, pool_config).await?;
    pricewatch_db::run_migrations(&pool).await?;

    let gemini = GeminiClient::with_base_url(
        api_key,
        model,
        config.gemini_request_timeout_secs,
        &config.gemini_base_url,
    )?;
    let orchestrator = Orchestrator::new(
        Arc::new(ChromiumLauncher::new(Duration::from_secs(
            config.navigation_timeout_secs,
        ))),
        Arc::new(PgCatalog::new(pool)),
        PriceExtractor::new(Arc::new(gemini), config.page_content_limit),
        Arc::new(FixedDelay::new(Duration::from_millis(
            config.inter_product_delay_ms,
        ))),
    );
    let job = PriceRefreshJob::new(
        Arc::new(orchestrator),
        config.max_run_secs.map(Duration::from_secs),
    );

    let mut scheduler = match build_scheduler(job.clone(), &config.cron_expression).await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            tracing::error!(
                cron_expression = %config.cron_expression,
                error = %e,
                "{}",
                e.startup_message()
            );
            return Err(e.into());
        }
    };
    tracing::info!(cron_expression = %config.cron_expression, "scheduler started");

    if cli.run_now {
        tokio::spawn(async move {
            job.trigger().await;
        });
    }

    shutdown_signal().await;
    scheduler.shutdown().await?;
    tracing::info!("scheduler stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!(signal = "SIGINT", "received shutdown signal"),
        () = terminate => tracing::info!(signal = "SIGTERM", "received shutdown signal"),
    }
}
