//! services/studio/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use podcast_core::PollPolicy;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where the bearer credential comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    /// A fixed token, for scripts and local development.
    Token(String),
    /// A file kept fresh by the identity provider's tooling; re-read before each call.
    TokenFile(PathBuf),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub user_id: String,
    pub credentials: CredentialSource,
    pub log_level: Level,
    pub poll_policy: PollPolicy,
    pub request_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };

        // --- Backend ---
        let api_base_url = required("STUDIO_API_BASE_URL")?;
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "STUDIO_API_BASE_URL".to_string(),
                format!("'{}' is not an http(s) URL", api_base_url),
            ));
        }
        let api_base_url = api_base_url.trim_end_matches('/').to_string();
        let user_id = required("STUDIO_USER_ID")?;

        let credentials = match (lookup("STUDIO_ACCESS_TOKEN"), lookup("STUDIO_TOKEN_FILE")) {
            (Some(token), _) if !token.trim().is_empty() => CredentialSource::Token(token.trim().to_string()),
            (_, Some(path)) if !path.trim().is_empty() => CredentialSource::TokenFile(PathBuf::from(path)),
            _ => return Err(ConfigError::MissingVar("STUDIO_ACCESS_TOKEN or STUDIO_TOKEN_FILE".to_string())),
        };

        // --- Logging ---
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Polling and timeouts ---
        let interval_ms = parse_or(&lookup, "STUDIO_POLL_INTERVAL_MS", 5000u64)?;
        if interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "STUDIO_POLL_INTERVAL_MS".to_string(),
                "the polling interval must be greater than zero".to_string(),
            ));
        }
        let max_attempts = parse_or(&lookup, "STUDIO_POLL_MAX_ATTEMPTS", PollPolicy::DEFAULT_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "STUDIO_POLL_MAX_ATTEMPTS".to_string(),
                "polling must allow at least one attempt".to_string(),
            ));
        }
        let timeout_secs = parse_or(&lookup, "STUDIO_REQUEST_TIMEOUT_SECS", 30u64)?;

        Ok(Self {
            api_base_url,
            user_id,
            credentials,
            log_level,
            poll_policy: PollPolicy::new(Duration::from_millis(interval_ms), max_attempts),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    const BASE: [(&str, &str); 3] = [
        ("STUDIO_API_BASE_URL", "https://api.example.test/functions/"),
        ("STUDIO_USER_ID", "user-1"),
        ("STUDIO_ACCESS_TOKEN", "tok"),
    ];

    #[test]
    fn defaults_apply() {
        let config = load(&BASE).unwrap();
        assert_eq!(config.api_base_url, "https://api.example.test/functions");
        assert_eq!(config.credentials, CredentialSource::Token("tok".to_string()));
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.poll_policy, PollPolicy::default());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_required_values_are_reported_by_name() {
        let err = load(&BASE[1..]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "STUDIO_API_BASE_URL"));

        let err = load(&BASE[..2]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
    }

    #[test]
    fn token_file_is_used_without_a_token() {
        let config = load(&[
            BASE[0],
            BASE[1],
            ("STUDIO_TOKEN_FILE", "/run/studio/token"),
        ])
        .unwrap();
        assert_eq!(
            config.credentials,
            CredentialSource::TokenFile(PathBuf::from("/run/studio/token"))
        );
    }

    #[test]
    fn invalid_numbers_and_zero_polling_values_are_rejected() {
        let mut vars = BASE.to_vec();
        vars.push(("STUDIO_POLL_MAX_ATTEMPTS", "0"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidValue(..))));

        let mut vars = BASE.to_vec();
        vars.push(("STUDIO_POLL_INTERVAL_MS", "0"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidValue(ref key, _)) if key == "STUDIO_POLL_INTERVAL_MS"
        ));

        let mut vars = BASE.to_vec();
        vars.push(("STUDIO_POLL_INTERVAL_MS", "soon"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidValue(..))));

        let mut vars = BASE.to_vec();
        vars.push(("STUDIO_POLL_INTERVAL_MS", "250"));
        vars.push(("STUDIO_POLL_MAX_ATTEMPTS", "3"));
        vars.push(("RUST_LOG", "debug"));
        let config = load(&vars).unwrap();
        assert_eq!(config.poll_policy.interval(), Duration::from_millis(250));
        assert_eq!(config.poll_policy.max_attempts(), 3);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn base_url_must_be_http() {
        let err = load(&[("STUDIO_API_BASE_URL", "ftp://x"), BASE[1], BASE[2]]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
    }
}
