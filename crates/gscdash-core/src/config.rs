use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Minimum length of `GSCDASH_SESSION_SECRET`, in bytes.
const MIN_SESSION_SECRET_LEN: usize = 32;

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
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
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
    let google_client_id = require("GOOGLE_CLIENT_ID")?;
    let google_client_secret = require("GOOGLE_CLIENT_SECRET")?;
    let session_secret = require("GSCDASH_SESSION_SECRET")?;
    if session_secret.len() < MIN_SESSION_SECRET_LEN {
        return Err(invalid(
            "GSCDASH_SESSION_SECRET",
            format!("must be at least {MIN_SESSION_SECRET_LEN} bytes"),
        ));
    }

    let env = parse_environment(&or_default("GSCDASH_ENV", "development"))?;

    let bind_addr = or_default("GSCDASH_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("GSCDASH_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("GSCDASH_LOG_LEVEL", "info");

    let public_base_url = or_default("GSCDASH_PUBLIC_BASE_URL", "http://localhost:3000")
        .trim_end_matches('/')
        .to_string();
    let oauth_redirect_url = lookup("GSCDASH_OAUTH_REDIRECT_URL")
        .unwrap_or_else(|_| format!("{public_base_url}/api/auth/callback"));

    let serprobot_api_key = lookup("SERPROBOT_API_KEY")
        .ok()
        .filter(|v| !v.trim().is_empty());

    let http_timeout_secs = parse_u64("GSCDASH_HTTP_TIMEOUT_SECS", "30")?;
    let query_cache_capacity = parse_u64("GSCDASH_QUERY_CACHE_CAPACITY", "10000")?;
    let watchlist_concurrency = parse_usize("GSCDASH_WATCHLIST_CONCURRENCY", "4")?;
    if watchlist_concurrency == 0 {
        return Err(invalid(
            "GSCDASH_WATCHLIST_CONCURRENCY",
            "must be greater than zero".to_string(),
        ));
    }

    let db_max_connections = parse_u32("GSCDASH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("GSCDASH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("GSCDASH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        public_base_url,
        google_client_id,
        google_client_secret,
        oauth_redirect_url,
        session_secret,
        serprobot_api_key,
        http_timeout_secs,
        query_cache_capacity,
        watchlist_concurrency,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unknown values are rejected rather than defaulting to development.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GSCDASH_ENV".to_string(),
            reason: format!("expected development, test or production, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
