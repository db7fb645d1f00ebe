pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod gemini;
pub mod orchestrator;
pub mod pacing;
pub mod types;

pub use error::{BoxError, CatalogError, FetchError, ModelError, RunError, ScrapeError};
pub use extractor::{build_prompt, parse_extraction_response, PriceExtractor};
pub use fetcher::{BrowserLauncher, BrowserSession, ChromiumLauncher};
pub use gemini::{GeminiClient, LanguageModel};
pub use orchestrator::{Orchestrator, ProductCatalog, RefreshRun};
pub use pacing::{FixedDelay, PacingPolicy};
pub use types::{ExtractionResult, RunSummary, ScrapeOutcome, ScrapeResult};
