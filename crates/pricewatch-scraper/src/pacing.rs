//! Delay between consecutive product scrapes.

use std::time::Duration;

use async_trait::async_trait;

pub const DEFAULT_INTER_PRODUCT_DELAY: Duration = Duration::from_millis(5_000);

/// Decides how long to wait after each product before starting the next.
#[async_trait]
pub trait PacingPolicy: Send + Sync {
    async fn pause(&self);
}

/// Waits the same fixed delay after every product, success or failure.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_INTER_PRODUCT_DELAY)
    }
}

#[async_trait]
impl PacingPolicy for FixedDelay {
    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}
