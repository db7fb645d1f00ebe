//! Price extraction from page text via a [`LanguageModel`].
//!
//! The extractor never fails: every problem (unreachable model, unparseable
//! answer, no price on the page) comes back as an [`ExtractionResult`] with
//! `price: None` and a reason in `error`.

use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::gemini::LanguageModel;
use crate::types::ExtractionResult;

pub const DEFAULT_CONTENT_LIMIT: usize = 15_000;

pub const INVALID_RESPONSE_FORMAT: &str = "Invalid response format";

const EXTRACTION_PROMPT: &str = r#"You are a price extraction assistant. Extract the main product price from the following webpage content.

Rules:
1. Find the PRIMARY selling price (not crossed-out prices, not "was" prices)
2. Return the numeric price value without currency symbols
3. If multiple prices exist, choose the main/current price

Return ONLY a valid JSON object in this exact format:
{"price": number or null, "error": "reason" or null}

Example responses:
{"price": 299.99, "error": null}
{"price": null, "error": "No price found on page"}
Webpage content:
"#;

/// Asks a language model for the current price shown on a page.
pub struct PriceExtractor {
    model: Arc<dyn LanguageModel>,
    content_limit: usize,
}

impl PriceExtractor {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, content_limit: usize) -> Self {
        Self {
            model,
            content_limit,
        }
    }

    pub async fn extract(&self, page_text: &str, product_name: Option<&str>) -> ExtractionResult {
        let prompt = build_prompt(page_text, product_name, self.content_limit);

        match self.model.generate(&prompt).await {
            Ok(text) => parse_extraction_response(&text),
            Err(e) => {
                tracing::error!(error = %e, "error extracting price");
                ExtractionResult::failure(e.to_string())
            }
        }
    }
}

/// Builds the full prompt: fixed instructions, an optional product-name hint,
/// then the first `content_limit` characters of the page.
#[must_use]
pub fn build_prompt(page_text: &str, product_name: Option<&str>, content_limit: usize) -> String {
    let truncated = match page_text.char_indices().nth(content_limit) {
        Some((byte_idx, _)) => &page_text[..byte_idx],
        None => page_text,
    };

    let mut prompt = String::with_capacity(EXTRACTION_PROMPT.len() + truncated.len() + 64);
    prompt.push_str(EXTRACTION_PROMPT);
    if let Some(name) = product_name {
        prompt.push_str("\nProduct we're looking for: ");
        prompt.push_str(name);
        prompt.push('\n');
    }
    prompt.push_str(truncated);
    prompt
}

/// Decodes the model's answer.
///
/// The JSON object is taken from the first `{` to the last `}` of the text,
/// so surrounding prose or code fences are ignored. A price given as a string
/// is parsed as a decimal; an unparseable string price becomes `None`.
#[must_use]
pub fn parse_extraction_response(text: &str) -> ExtractionResult {
    let text = text.trim();
    let re = Regex::new(r"(?s)\{.*\}").expect("valid json span regex");

    let Some(span) = re.find(text) else {
        tracing::warn!(response = text, "failed to parse response as JSON");
        return ExtractionResult::failure(INVALID_RESPONSE_FORMAT);
    };

    let parsed: Value = match serde_json::from_str(span.as_str()) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(response = text, error = %e, "response JSON did not decode");
            return ExtractionResult::failure(e.to_string());
        }
    };

    let price = match parsed.get("price") {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Some(Value::String(s)) => parse_price_string(s),
        _ => None,
    };

    let error = parsed
        .get("error")
        .and_then(Value::as_str)
        .filter(|reason| !reason.is_empty())
        .map(str::to_owned);

    ExtractionResult { price, error }
}

/// Reads the longest leading decimal number, the way a lenient float parse
/// does: `"12.50 USD"` is 12.50, `"1.2.3"` is 1.2 and `"1e3"` is 1000.
/// Text that does not start with a number (`"$5"`) yields `None`.
fn parse_price_string(raw: &str) -> Option<Decimal> {
    let re = Regex::new(r"^(?P<mantissa>[+-]?(?:\d+\.?\d*|\.\d+))(?:[eE](?P<exp>[+-]?\d+))?")
        .expect("valid leading number regex");
    let caps = re.captures(raw.trim_start())?;

    let mantissa = caps["mantissa"].trim_end_matches('.');
    let (sign, digits) = match mantissa.strip_prefix(['+', '-']) {
        Some(rest) => (&mantissa[..1], rest),
        None => ("", mantissa),
    };
    let digits = if digits.starts_with('.') {
        format!("0{digits}")
    } else {
        digits.to_owned()
    };
    let sign = if sign == "+" { "" } else { sign };

    match caps.name("exp") {
        Some(exp) => Decimal::from_scientific(&format!("{sign}{digits}e{}", exp.as_str())).ok(),
        None => Decimal::from_str(&format!("{sign}{digits}")).ok(),
    }
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
