use crate::app_config::{AppConfig, Environment, ProviderKind, MAX_RESCORE_INTERVAL_SECS};
use crate::ConfigError;

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
/// Parsing and validation are decoupled from the real environment so tests can
/// drive them with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

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

    let parse_positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("HNRANK_ENV", "development"))?;

    let bind_addr = or_default("HNRANK_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("HNRANK_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("HNRANK_LOG_LEVEL", "info");

    let history_capacity = parse_positive_usize("HNRANK_HISTORY_CAPACITY", "20")?;
    let rescore_interval_secs = parse_positive_u64("HNRANK_RESCORE_INTERVAL_SECS", "1800")?;
    if rescore_interval_secs > MAX_RESCORE_INTERVAL_SECS {
        return Err(invalid(
            "HNRANK_RESCORE_INTERVAL_SECS",
            format!("must be at most {MAX_RESCORE_INTERVAL_SECS}"),
        ));
    }
    let rescore_max_concurrent_jobs =
        parse_positive_usize("HNRANK_RESCORE_MAX_CONCURRENT_JOBS", "3")?;
    let insight_stale_after_secs = parse_positive_u64("HNRANK_INSIGHT_STALE_AFTER_SECS", "7200")?;
    let rescore_run_on_start = parse_bool(
        "HNRANK_RESCORE_RUN_ON_START",
        &or_default("HNRANK_RESCORE_RUN_ON_START", "true"),
    )?;

    let score_provider = or_default("HNRANK_SCORE_PROVIDER", "lexicon")
        .parse::<ProviderKind>()
        .map_err(|reason| invalid("HNRANK_SCORE_PROVIDER", reason))?;
    let openai_api_key = lookup("OPENAI_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());
    let openai_model = or_default("HNRANK_OPENAI_MODEL", "gpt-4o-mini");
    let openai_base_url = or_default("HNRANK_OPENAI_BASE_URL", "https://api.openai.com");
    let provider_timeout_secs = parse_positive_u64("HNRANK_PROVIDER_TIMEOUT_SECS", "30")?;
    let provider_max_retries = parse_u32("HNRANK_PROVIDER_MAX_RETRIES", "2")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        history_capacity,
        rescore_interval_secs,
        rescore_max_concurrent_jobs,
        insight_stale_after_secs,
        rescore_run_on_start,
        score_provider,
        openai_api_key,
        openai_model,
        openai_base_url,
        provider_timeout_secs,
        provider_max_retries,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "HNRANK_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
