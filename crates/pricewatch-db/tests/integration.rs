//! Offline unit tests for pricewatch-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use chrono::Utc;
use pricewatch_core::{AppConfig, Currency, Environment, Product};
use pricewatch_db::{DbError, PoolConfig, ProductRow};
use rust_decimal::Decimal;
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        cron_expression: "0 0 */6 * * *".to_string(),
        gemini_api_key: None,
        gemini_model: None,
        gemini_base_url: "https://generativelanguage.googleapis.com/".to_string(),
        gemini_request_timeout_secs: 60,
        navigation_timeout_secs: 30,
        inter_product_delay_ms: 5000,
        page_content_limit: 15_000,
        max_run_secs: None,
    }
}

fn product_row(currency: &str) -> ProductRow {
    ProductRow {
        product_id: Uuid::now_v7(),
        store_id: Uuid::now_v7(),
        name: "Laptop X1".to_string(),
        url: "https://shop.example.com/x1".to_string(),
        currency: currency.to_string(),
        current_price: Some(Decimal::from_str("2999.90").unwrap()),
        price_change_percentage: Some(Decimal::from_str("-3.5").unwrap()),
        last_updated: Some(Utc::now()),
        created_at: Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn product_row_converts_to_domain_product() {
    let row = product_row("PEN");
    let product_id = row.product_id;
    let product = Product::try_from(row).expect("valid row converts");

    assert_eq!(product.product_id, product_id);
    assert_eq!(product.currency, Currency::Pen);
    assert_eq!(product.current_price, Some(Decimal::from_str("2999.90").unwrap()));
}

#[test]
fn product_row_with_unknown_currency_is_rejected() {
    let result = Product::try_from(product_row("EUR"));
    assert!(
        matches!(result, Err(DbError::InvalidColumn { column: "products.currency", ref value }) if value == "EUR"),
        "expected InvalidColumn, got: {result:?}"
    );
}
