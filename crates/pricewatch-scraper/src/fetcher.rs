//! Headless-browser page fetcher.
//!
//! A [`BrowserLauncher`] starts one [`BrowserSession`] per refresh run; the
//! session opens a fresh page for every product URL and always closes it
//! again, whether navigation succeeded, failed, or timed out.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::error::FetchError;

pub const VIEWPORT_WIDTH: u32 = 1280;
pub const VIEWPORT_HEIGHT: u32 = 720;
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// How long the page's resource count must stay unchanged before the page is
/// considered settled.
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

const VISIBLE_TEXT_SCRIPT: &str = r"(() => {
  document.querySelectorAll('script, style, noscript').forEach((el) => el.remove());
  return document.body ? (document.body.innerText || '') : '';
})()";

const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// # Errors
    ///
    /// Returns [`FetchError`] if the browser cannot be started.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError>;
}

/// A running browser shared by every page fetched during one run.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Loads `url` in a new page and returns the page's visible text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on navigation failure, on timeout, or if the
    /// text cannot be read.
    async fn fetch_page_text(&self, url: &str) -> Result<String, FetchError>;

    /// Shuts the browser down. Failures are logged, not returned.
    async fn close(&mut self);
}

/// Launches headless Chromium through the `DevTools` protocol.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    navigation_timeout: Duration,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(navigation_timeout: Duration) -> Self {
        Self { navigation_timeout }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .build()
            .map_err(FetchError::Config)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler event error");
                }
            }
        });

        tracing::info!("browser started");

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
            navigation_timeout: self.navigation_timeout,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    navigation_timeout: Duration,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn fetch_page_text(&self, url: &str) -> Result<String, FetchError> {
        let page = self.browser.new_page("about:blank").await?;

        let result = match tokio::time::timeout(
            self.navigation_timeout,
            load_visible_text(&page, url),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.navigation_timeout.as_secs(),
            }),
        };

        if let Err(e) = page.close().await {
            tracing::warn!(url, error = %e, "failed to close page");
        }

        result
    }

    async fn close(&mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!(error = %e, "failed to close browser");
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!(error = %e, "failed to wait for browser exit");
        }
        self.handler_task.abort();
        tracing::info!("browser closed");
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

async fn load_visible_text(page: &Page, url: &str) -> Result<String, FetchError> {
    page.execute(SetDeviceMetricsOverrideParams::new(
        i64::from(VIEWPORT_WIDTH),
        i64::from(VIEWPORT_HEIGHT),
        1.0,
        false,
    ))
    .await?;
    page.execute(SetExtraHttpHeadersParams::new(Headers::new(
        serde_json::json!({ "Accept-Language": ACCEPT_LANGUAGE }),
    )))
    .await?;

    page.goto(url).await?;
    wait_for_network_idle(page).await?;

    page.evaluate(VISIBLE_TEXT_SCRIPT)
        .await?
        .into_value::<String>()
        .map_err(|source| FetchError::Script {
            context: format!("visible text of {url}"),
            source,
        })
}

/// Polls the page's resource count until it stops changing for one idle
/// window. Bounded by the caller's navigation timeout.
async fn wait_for_network_idle(page: &Page) -> Result<(), FetchError> {
    let mut previous = resource_count(page).await?;
    loop {
        tokio::time::sleep(NETWORK_IDLE_WINDOW).await;
        let current = resource_count(page).await?;
        if current == previous {
            return Ok(());
        }
        previous = current;
    }
}

async fn resource_count(page: &Page) -> Result<u64, FetchError> {
    page.evaluate(RESOURCE_COUNT_SCRIPT)
        .await?
        .into_value::<u64>()
        .map_err(|source| FetchError::Script {
            context: "resource count".to_owned(),
            source,
        })
}
