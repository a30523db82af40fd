use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Upper bound on places requested per prompt. Larger lists blow past the
/// model's output budget and get truncated mid-block.
const MAX_PLACE_COUNT: usize = 20;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` instead of `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset so `.env` templates with blank keys work.
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

    let env = parse_environment(&or_default("TRIPDASH_ENV", "development"))?;

    let bind_addr = or_default("TRIPDASH_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("TRIPDASH_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("TRIPDASH_LOG_LEVEL", "info");

    let gemini_api_key = optional("GEMINI_API_KEY");
    let gemini_model = or_default("TRIPDASH_GEMINI_MODEL", "gemini-1.5-flash");
    let gemini_base_url = or_default(
        "TRIPDASH_GEMINI_BASE_URL",
        "https://generativelanguage.googleapis.com",
    );
    let gemini_timeout_secs = parse_u64("TRIPDASH_GEMINI_TIMEOUT_SECS", "30")?;
    if gemini_timeout_secs == 0 {
        return Err(invalid(
            "TRIPDASH_GEMINI_TIMEOUT_SECS",
            "must be at least 1 second".to_string(),
        ));
    }

    let place_count = parse_usize("TRIPDASH_PLACE_COUNT", "5")?;
    if !(1..=MAX_PLACE_COUNT).contains(&place_count) {
        return Err(invalid(
            "TRIPDASH_PLACE_COUNT",
            format!("must be between 1 and {MAX_PLACE_COUNT}, got {place_count}"),
        ));
    }

    let maps_api_key = optional("GOOGLE_MAPS_API_KEY");
    let catalog_path = optional("TRIPDASH_CATALOG_PATH").map(PathBuf::from);
    let trip_path = optional("TRIPDASH_TRIP_PATH").map(PathBuf::from);

    let currency = or_default("TRIPDASH_CURRENCY", "LKR");
    if currency.trim().is_empty() {
        return Err(invalid("TRIPDASH_CURRENCY", "must be non-empty".to_string()));
    }

    let live_delay_ms = parse_u64("TRIPDASH_LIVE_DELAY_MS", "2000")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        gemini_api_key,
        gemini_model,
        gemini_base_url,
        gemini_timeout_secs,
        place_count,
        maps_api_key,
        catalog_path,
        trip_path,
        currency,
        live_delay_ms,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TRIPDASH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
