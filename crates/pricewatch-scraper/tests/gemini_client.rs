//! Integration tests for `GeminiClient` and `PriceExtractor`.
//!
//! Uses `wiremock` to stand in for the Gemini REST API so no real network
//! traffic is made.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricewatch_scraper::{GeminiClient, LanguageModel, ModelError, PriceExtractor};

const MODEL: &str = "gemini-2.0-flash";
const GENERATE_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

fn test_client(server: &MockServer) -> GeminiClient {
    GeminiClient::with_base_url("test-key", MODEL, 5, &server.uri())
        .expect("failed to build test GeminiClient")
}

fn candidate_json(parts: &[&str]) -> serde_json::Value {
    let parts: Vec<_> = parts.iter().map(|text| json!({ "text": text })).collect();
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": parts },
            "finishReason": "STOP"
        }]
    })
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_posts_prompt_and_joins_candidate_parts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "hello" }] }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(&candidate_json(&["{\"price\": ", "12.5}"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let text = test_client(&server)
        .generate("hello")
        .await
        .expect("generate succeeds");

    assert_eq!(text, "{\"price\": 12.5}");
}

#[tokio::test]
async fn api_error_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(&json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .mount(&server)
        .await;

    let result = test_client(&server).generate("hello").await;

    match result {
        Err(ModelError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "API key not valid. Please pass a valid API key.");
        }
        other => panic!("expected ModelError::Api, got: {other:?}"),
    }
}

#[tokio::test]
async fn response_without_candidates_is_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let result = test_client(&server).generate("hello").await;

    assert!(
        matches!(result, Err(ModelError::EmptyResponse)),
        "expected EmptyResponse, got: {result:?}"
    );
}

#[tokio::test]
async fn non_json_success_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let result = test_client(&server).generate("hello").await;

    assert!(
        matches!(result, Err(ModelError::Deserialize { .. })),
        "expected Deserialize, got: {result:?}"
    );
}

// ---------------------------------------------------------------------------
// PriceExtractor over the real client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn extractor_parses_price_from_fenced_model_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&candidate_json(&[
            "```json\n{\"price\": 1299.9, \"error\": null}\n```",
        ])))
        .mount(&server)
        .await;

    let extractor = PriceExtractor::new(Arc::new(test_client(&server)), 15_000);
    let result = extractor
        .extract("Laptop X1 S/ 1,299.90", Some("Laptop X1"))
        .await;

    assert_eq!(result.price, Some(Decimal::from_str("1299.9").unwrap()));
    assert_eq!(result.error, None);
}

#[tokio::test]
async fn extractor_reports_service_failure_without_price() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let extractor = PriceExtractor::new(Arc::new(test_client(&server)), 15_000);
    let result = extractor.extract("page", None).await;

    assert_eq!(result.price, None);
    assert_eq!(
        result.error.as_deref(),
        Some("language model returned HTTP 503: overloaded")
    );
}
