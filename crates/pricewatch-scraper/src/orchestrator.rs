//! One full price-refresh pass over every tracked product.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use pricewatch_core::{PriceHistory, Product};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{CatalogError, RunError, ScrapeError};
use crate::extractor::PriceExtractor;
use crate::fetcher::{BrowserLauncher, BrowserSession};
use crate::pacing::PacingPolicy;
use crate::types::ScrapeResult;

pub const FAILED_TO_EXTRACT_PRICE: &str = "Failed to extract price";

/// Where the orchestrator reads products from and records prices to.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Every tracked product, in processing order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the products cannot be loaded.
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError>;

    /// Appends a price observation and refreshes the product's cached
    /// pricing fields as one atomic unit.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ProductNotFound`] if the product is gone, or
    /// [`CatalogError::Backend`] if the write fails.
    async fn record_price(
        &self,
        product_id: Uuid,
        price: Decimal,
    ) -> Result<PriceHistory, CatalogError>;
}

/// Anything the scheduler can trigger as one refresh run.
#[async_trait]
pub trait RefreshRun: Send + Sync {
    /// # Errors
    ///
    /// Returns [`RunError`] when the run cannot start or the product set
    /// cannot be loaded. Per-product failures are reported in the results.
    async fn run_once(&self) -> Result<Vec<ScrapeResult>, RunError>;
}

/// Drives fetch, extract, and record for each product in turn.
pub struct Orchestrator {
    launcher: Arc<dyn BrowserLauncher>,
    catalog: Arc<dyn ProductCatalog>,
    extractor: PriceExtractor,
    pacing: Arc<dyn PacingPolicy>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        catalog: Arc<dyn ProductCatalog>,
        extractor: PriceExtractor,
        pacing: Arc<dyn PacingPolicy>,
    ) -> Self {
        Self {
            launcher,
            catalog,
            extractor,
            pacing,
        }
    }

    /// Scrapes every product once, sequentially, returning one result per
    /// product. The browser session is closed before returning, whatever the
    /// outcome.
    ///
    /// # Errors
    ///
    /// - [`RunError::BrowserLaunch`] if the browser cannot be started.
    /// - [`RunError::ProductListing`] if the product set cannot be loaded.
    pub async fn run_once(&self) -> Result<Vec<ScrapeResult>, RunError> {
        let mut session = self
            .launcher
            .launch()
            .await
            .map_err(RunError::BrowserLaunch)?;

        let outcome = self.scrape_all(session.as_ref()).await;
        session.close().await;
        outcome
    }

    async fn scrape_all(
        &self,
        session: &dyn BrowserSession,
    ) -> Result<Vec<ScrapeResult>, RunError> {
        let products = self
            .catalog
            .list_products()
            .await
            .map_err(RunError::ProductListing)?;

        tracing::info!(count = products.len(), "starting scrape");

        let mut results = Vec::with_capacity(products.len());
        for product in &products {
            results.push(self.scrape_product(session, product).await);
            self.pacing.pause().await;
        }

        tracing::info!("scrape completed");
        Ok(results)
    }

    async fn scrape_product(&self, session: &dyn BrowserSession, product: &Product) -> ScrapeResult {
        let start = Instant::now();
        tracing::info!(
            product_id = %product.product_id,
            url = %product.url,
            "starting scrape for product"
        );

        let attempt = AssertUnwindSafe(self.try_scrape_product(session, product))
            .catch_unwind()
            .await;

        match attempt {
            Ok(Ok(result)) => {
                if let Some(price) = result.price() {
                    tracing::info!(
                        product_id = %product.product_id,
                        price = %price,
                        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "successfully scraped and updated price"
                    );
                }
                result
            }
            Ok(Err(e)) => {
                tracing::error!(
                    product_id = %product.product_id,
                    error = %e,
                    "error scraping product"
                );
                ScrapeResult::failed(product.product_id, e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(
                    product_id = %product.product_id,
                    error = %message,
                    "panic while scraping product"
                );
                ScrapeResult::failed(product.product_id, message)
            }
        }
    }

    async fn try_scrape_product(
        &self,
        session: &dyn BrowserSession,
        product: &Product,
    ) -> Result<ScrapeResult, ScrapeError> {
        let page_text = session.fetch_page_text(&product.url).await?;
        let extraction = self
            .extractor
            .extract(&page_text, Some(&product.name))
            .await;

        let Some(price) = extraction.recordable_price() else {
            tracing::warn!(
                product_id = %product.product_id,
                error = extraction.error.as_deref(),
                "failed to extract price"
            );
            let reason = extraction
                .error
                .unwrap_or_else(|| FAILED_TO_EXTRACT_PRICE.to_owned());
            return Ok(ScrapeResult::failed(product.product_id, reason));
        };

        self.catalog.record_price(product.product_id, price).await?;
        Ok(ScrapeResult::recorded(product.product_id, price))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned());
    format!("panic while scraping: {detail}")
}

#[async_trait]
impl RefreshRun for Orchestrator {
    async fn run_once(&self) -> Result<Vec<ScrapeResult>, RunError> {
        Orchestrator::run_once(self).await
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
