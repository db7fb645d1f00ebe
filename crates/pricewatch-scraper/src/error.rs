use thiserror::Error;
use uuid::Uuid;

/// Boxed error used by [`ProductCatalog`](crate::ProductCatalog) backends.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure while driving the headless browser.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("invalid browser configuration: {0}")]
    Config(String),

    #[error("navigation to {url} did not settle within {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("unexpected script result for {context}: {source}")]
    Script {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure while calling the language model service.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("language model returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("language model returned no text")]
    EmptyResponse,

    #[error("invalid language model base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

/// Failure reported by the product catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product {0} not found")]
    ProductNotFound(Uuid),

    #[error("{0}")]
    Backend(#[source] BoxError),
}

/// Failure while processing a single product. Never escapes a run; it is
/// folded into a failed [`ScrapeResult`](crate::ScrapeResult).
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Record(#[from] CatalogError),
}

/// Failure that aborts a whole refresh run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to launch browser: {0}")]
    BrowserLaunch(#[source] FetchError),

    #[error("failed to list products: {0}")]
    ProductListing(#[source] CatalogError),
}
