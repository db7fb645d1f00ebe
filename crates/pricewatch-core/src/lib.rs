pub mod app_config;
pub mod config;
pub mod products;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{
    is_recordable_price, price_change_percentage, Currency, PriceHistory, Product, Store, MAX_PRICE,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("price change from {prior} to {new_price} is out of range")]
    PriceChangeOverflow {
        prior: rust_decimal::Decimal,
        new_price: rust_decimal::Decimal,
    },
}
