use std::str::FromStr;
use std::time::Duration as StdDuration;

use pairauth_core::credential::DEFAULT_CREDENTIAL_LENGTH;
use pairauth_core::session::{SessionConfig, DEFAULT_REFRESH_TTL_DAYS};

use crate::auth::jwt::JwtConfig;

/// Invalid or missing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Upper bound for `REFRESH_EXPIRY_DAYS`. Keeps `now + ttl` well inside the
/// representable timestamp range.
pub const MAX_REFRESH_EXPIRY_DAYS: i64 = 3650;

/// Read `var` through `lookup`, falling back to `default` when unset.
pub(crate) fn env_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

/// Server configuration loaded from environment variables.
///
/// Everything except `JWT_SECRET` has a default suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// Per-request deadline in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for background tasks after the listener stops (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Interval between expired-session sweeps in seconds (default: `3600`).
    pub sweep_interval_secs: u64,
    /// Mark session cookies `Secure` (default: `false`).
    pub cookie_secure: bool,
    /// Access credential signing and lifetime.
    pub jwt: JwtConfig,
    /// Refresh credential lifetime, length, and store deadline.
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                       | Default                    |
    /// |-------------------------------|----------------------------|
    /// | `HOST`                        | `0.0.0.0`                  |
    /// | `PORT`                        | `3000`                     |
    /// | `CORS_ORIGINS`                | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`                       |
    /// | `SESSION_SWEEP_INTERVAL_SECS` | `3600`                     |
    /// | `COOKIE_SECURE`               | `false`                    |
    /// | `REFRESH_EXPIRY_DAYS`         | `30`                       |
    /// | `REFRESH_CREDENTIAL_LENGTH`   | `30`                       |
    /// | `STORE_TIMEOUT_SECS`          | `5`                        |
    ///
    /// JWT settings are documented on [`JwtConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|var: &str| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = env_or(lookup, "PORT", 3000)?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or(lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs: u64 = env_or(lookup, "SHUTDOWN_TIMEOUT_SECS", 30)?;
        let sweep_interval_secs: u64 = positive(
            env_or(lookup, "SESSION_SWEEP_INTERVAL_SECS", 3600)?,
            "SESSION_SWEEP_INTERVAL_SECS",
        )?;
        let cookie_secure: bool = env_or(lookup, "COOKIE_SECURE", false)?;

        let jwt = JwtConfig::from_lookup(lookup)?;
        let session = session_config(lookup)?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            sweep_interval_secs,
            cookie_secure,
            jwt,
            session,
        })
    }
}

fn session_config<F>(lookup: &F) -> Result<SessionConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let refresh_days: i64 = env_or(lookup, "REFRESH_EXPIRY_DAYS", DEFAULT_REFRESH_TTL_DAYS)?;
    if !(1..=MAX_REFRESH_EXPIRY_DAYS).contains(&refresh_days) {
        return Err(ConfigError::Invalid {
            var: "REFRESH_EXPIRY_DAYS",
            value: refresh_days.to_string(),
        });
    }

    let credential_length: usize = positive(
        env_or(lookup, "REFRESH_CREDENTIAL_LENGTH", DEFAULT_CREDENTIAL_LENGTH)?,
        "REFRESH_CREDENTIAL_LENGTH",
    )?;
    let store_timeout_secs: u64 =
        positive(env_or(lookup, "STORE_TIMEOUT_SECS", 5)?, "STORE_TIMEOUT_SECS")?;

    Ok(SessionConfig {
        refresh_ttl: chrono::Duration::days(refresh_days),
        credential_length,
        store_timeout: StdDuration::from_secs(store_timeout_secs),
    })
}

/// Reject a zero value for `var`.
fn positive<T>(value: T, var: &'static str) -> Result<T, ConfigError>
where
    T: Default + PartialEq + ToString,
{
    if value == T::default() {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        });
    }
    Ok(value)
}
