use rust_decimal::Decimal;
use uuid::Uuid;

/// What the language model reported for one page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionResult {
    pub price: Option<Decimal>,
    pub error: Option<String>,
}

impl ExtractionResult {
    #[must_use]
    pub fn price(price: Decimal) -> Self {
        Self {
            price: Some(price),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            price: None,
            error: Some(reason.into()),
        }
    }

    /// The extracted price, if there is one worth recording (strictly
    /// positive and no larger than [`MAX_PRICE`](pricewatch_core::MAX_PRICE)).
    #[must_use]
    pub fn recordable_price(&self) -> Option<Decimal> {
        self.price
            .filter(|price| pricewatch_core::is_recordable_price(*price))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    Recorded { price: Decimal },
    Failed { error: String },
}

/// Per-product outcome of one refresh run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeResult {
    pub product_id: Uuid,
    pub outcome: ScrapeOutcome,
}

impl ScrapeResult {
    #[must_use]
    pub fn recorded(product_id: Uuid, price: Decimal) -> Self {
        Self {
            product_id,
            outcome: ScrapeOutcome::Recorded { price },
        }
    }

    #[must_use]
    pub fn failed(product_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            product_id,
            outcome: ScrapeOutcome::Failed {
                error: error.into(),
            },
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ScrapeOutcome::Recorded { .. })
    }

    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        match self.outcome {
            ScrapeOutcome::Recorded { price } => Some(price),
            ScrapeOutcome::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ScrapeOutcome::Recorded { .. } => None,
            ScrapeOutcome::Failed { error } => Some(error),
        }
    }
}

/// Aggregate counts for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl RunSummary {
    #[must_use]
    pub fn from_results(results: &[ScrapeResult]) -> Self {
        let successful = results.iter().filter(|r| r.is_success()).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
        }
    }
}
