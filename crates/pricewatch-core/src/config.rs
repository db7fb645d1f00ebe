use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_CRON_EXPRESSION: &str = "0 0 */6 * * *";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files; useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup, no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Blank values count as unset so an empty `GEMINI_API_KEY=` line in `.env`
    // does not pass the scheduler's required-credential check.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("PRICEWATCH_ENV", "development"));
    let bind_addr = parse_addr("PRICEWATCH_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PRICEWATCH_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("PRICEWATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PRICEWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PRICEWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let cron_expression = optional("CRON_EXPRESSION")
        .unwrap_or_else(|| DEFAULT_CRON_EXPRESSION.to_string());
    let gemini_api_key = optional("GEMINI_API_KEY");
    let gemini_model = optional("GEMINI_MODEL");
    let gemini_base_url = or_default("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL);
    let gemini_request_timeout_secs = parse_u64("GEMINI_REQUEST_TIMEOUT_SECS", "60")?;

    let navigation_timeout_secs = parse_u64("PRICEWATCH_NAVIGATION_TIMEOUT_SECS", "30")?;
    let inter_product_delay_ms = parse_u64("PRICEWATCH_INTER_PRODUCT_DELAY_MS", "5000")?;
    let page_content_limit = parse_usize("PRICEWATCH_PAGE_CONTENT_LIMIT", "15000")?;
    if page_content_limit == 0 {
        return Err(invalid(
            "PRICEWATCH_PAGE_CONTENT_LIMIT",
            "must be greater than zero".to_string(),
        ));
    }

    let max_run_secs = match optional("PRICEWATCH_MAX_RUN_SECS") {
        Some(raw) => Some(
            raw.parse::<u64>()
                .map_err(|e| invalid("PRICEWATCH_MAX_RUN_SECS", e.to_string()))?,
        ),
        None => None,
    };

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        cron_expression,
        gemini_api_key,
        gemini_model,
        gemini_base_url,
        gemini_request_timeout_secs,
        navigation_timeout_secs,
        inter_product_delay_ms,
        page_content_limit,
        max_run_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
