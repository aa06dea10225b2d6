//! Runtime settings resolved from environment variables.
//!
//! Every value has a default, so a bare `sleeper-sync` invocation talks to the
//! public API and keeps its database under the user's cache directory.

use crate::error::{Result, SleeperError};
use crate::sleeper::http::{RetryPolicy, SLEEPER_BASE_URL};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const BASE_URL_ENV_VAR: &str = "SLEEPER_API_BASE_URL";
pub const DB_PATH_ENV_VAR: &str = "SLEEPER_DB_PATH";
pub const MAX_ATTEMPTS_ENV_VAR: &str = "SLEEPER_MAX_ATTEMPTS";
pub const BACKOFF_MS_ENV_VAR: &str = "SLEEPER_BACKOFF_MS";
pub const MAX_BACKOFF_MS_ENV_VAR: &str = "SLEEPER_MAX_BACKOFF_MS";
pub const TIMEOUT_SECS_ENV_VAR: &str = "SLEEPER_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV_VAR: &str = "SLEEPER_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub db_path: PathBuf,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: SLEEPER_BASE_URL.to_string(),
            db_path: default_db_path(),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
            log_format: LogFormat::default(),
        }
    }
}

/// Path: ~/.cache/sleeper-sync/leagues.db
pub fn default_db_path() -> PathBuf {
    let base = dirs::cache_dir().unwrap_or_else(|| {
        let mut home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.push(".cache");
        home
    });
    base.join("sleeper-sync").join("leagues.db")
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| SleeperError::Config {
        message: format!("{name} has invalid value {raw:?}"),
    })
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(url) = lookup(BASE_URL_ENV_VAR) {
            settings.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = lookup(DB_PATH_ENV_VAR) {
            settings.db_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(MAX_ATTEMPTS_ENV_VAR) {
            let attempts: u32 = parse_var(MAX_ATTEMPTS_ENV_VAR, &raw)?;
            if attempts == 0 {
                return Err(SleeperError::Config {
                    message: format!("{MAX_ATTEMPTS_ENV_VAR} must be at least 1"),
                });
            }
            settings.retry.max_attempts = attempts;
        }
        if let Some(raw) = lookup(BACKOFF_MS_ENV_VAR) {
            settings.retry.initial_backoff =
                Duration::from_millis(parse_var(BACKOFF_MS_ENV_VAR, &raw)?);
        }
        if let Some(raw) = lookup(MAX_BACKOFF_MS_ENV_VAR) {
            settings.retry.max_backoff =
                Duration::from_millis(parse_var(MAX_BACKOFF_MS_ENV_VAR, &raw)?);
        }
        if let Some(raw) = lookup(TIMEOUT_SECS_ENV_VAR) {
            settings.request_timeout = Duration::from_secs(parse_var(TIMEOUT_SECS_ENV_VAR, &raw)?);
        }
        if let Some(raw) = lookup(LOG_FORMAT_ENV_VAR) {
            settings.log_format = match raw.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "" => LogFormat::Pretty,
                other => {
                    return Err(SleeperError::Config {
                        message: format!("{LOG_FORMAT_ENV_VAR} must be pretty or json, got {other:?}"),
                    })
                }
            };
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.base_url, SLEEPER_BASE_URL);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.log_format, LogFormat::Pretty);
        assert!(settings.db_path.ends_with("sleeper-sync/leagues.db"));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (BASE_URL_ENV_VAR, "http://localhost:9000/v1/"),
            (DB_PATH_ENV_VAR, "/tmp/test.db"),
            (MAX_ATTEMPTS_ENV_VAR, "3"),
            (BACKOFF_MS_ENV_VAR, "0"),
            (TIMEOUT_SECS_ENV_VAR, "2"),
            (LOG_FORMAT_ENV_VAR, "JSON"),
        ]))
        .unwrap();

        assert_eq!(settings.base_url, "http://localhost:9000/v1");
        assert_eq!(settings.db_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.retry.initial_backoff, Duration::ZERO);
        assert_eq!(settings.request_timeout, Duration::from_secs(2));
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        let err = Settings::from_lookup(lookup(&[(MAX_ATTEMPTS_ENV_VAR, "many")])).unwrap_err();
        assert!(err.to_string().contains(MAX_ATTEMPTS_ENV_VAR));

        let err = Settings::from_lookup(lookup(&[(MAX_ATTEMPTS_ENV_VAR, "0")])).unwrap_err();
        assert!(matches!(err, SleeperError::Config { .. }));
    }

    #[test]
    fn test_invalid_log_format() {
        assert!(Settings::from_lookup(lookup(&[(LOG_FORMAT_ENV_VAR, "xml")])).is_err());
    }
}
