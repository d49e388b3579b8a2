use std::path::PathBuf;

use thiserror::Error;

use crate::app_config::AppConfig;
use crate::records::Credentials;

pub const DEFAULT_ORDERS_URL: &str = "https://www.amazon.com/gp/your-account/order-history";
pub const DEFAULT_SIGNIN_URL: &str = "https://www.amazon.com/ap/signin";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for
/// testing or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Load the credential pair from `ORDERHIST_EMAIL` / `ORDERHIST_PASSWORD`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` when either variable is absent or
/// empty — the login flow requires a non-empty pair.
pub fn load_credentials() -> Result<Credentials, ConfigError> {
    dotenvy::dotenv().ok();
    build_credentials(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup — no
/// `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(true),
                "0" | "false" | "no" => Ok(false),
                other => Err(ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: format!("expected a boolean, got \"{other}\""),
                }),
            },
        }
    };

    let session_dir = match lookup("ORDERHIST_SESSION_DIR") {
        Ok(raw) => PathBuf::from(raw),
        Err(_) => default_session_dir(),
    };
    let diagnostics_dir = match lookup("ORDERHIST_DIAGNOSTICS_DIR") {
        Ok(raw) => PathBuf::from(raw),
        Err(_) => std::env::temp_dir(),
    };

    let log_level = or_default("ORDERHIST_LOG_LEVEL", "info");
    let headless = parse_bool("ORDERHIST_HEADLESS", true)?;
    let max_orders = parse_usize("ORDERHIST_MAX_ORDERS", "50")?;
    let max_pages = parse_usize("ORDERHIST_MAX_PAGES", "5")?;
    let orders_url = or_default("ORDERHIST_ORDERS_URL", DEFAULT_ORDERS_URL);
    let signin_url = or_default("ORDERHIST_SIGNIN_URL", DEFAULT_SIGNIN_URL);
    let nav_timeout_secs = parse_u64("ORDERHIST_NAV_TIMEOUT_SECS", "30")?;
    let verify_timeout_secs = parse_u64("ORDERHIST_VERIFY_TIMEOUT_SECS", "15")?;

    Ok(AppConfig {
        log_level,
        session_dir,
        diagnostics_dir,
        headless,
        max_orders,
        max_pages,
        orders_url,
        signin_url,
        nav_timeout_secs,
        verify_timeout_secs,
    })
}

fn build_credentials<F>(lookup: F) -> Result<Credentials, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    Ok(Credentials {
        email: require("ORDERHIST_EMAIL")?,
        password: require("ORDERHIST_PASSWORD")?,
    })
}

fn default_session_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".orderhist")
        .join("session")
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
