use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_WATCH_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub request_timeout: Duration,
    /// Zero disables the background status watcher.
    pub watch_interval: Duration,
}

impl Config {
    /// Reads the process environment (after `.env` has been loaded).
    ///
    /// - `CAMPUS_API_URL` (default `http://127.0.0.1:8000/api`)
    /// - `CAMPUS_ACCESS_TOKEN` / `CAMPUS_REFRESH_TOKEN` (optional)
    /// - `CAMPUS_TIMEOUT_SECS` (default 15)
    /// - `CAMPUS_WATCH_SECS` (default 60, 0 disables)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_url = get("CAMPUS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "CAMPUS_API_URL must be an http(s) URL, got '{api_url}'"
            )));
        }

        let timeout_secs = parse_secs(&get, "CAMPUS_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(Error::Config(
                "CAMPUS_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        let watch_secs = parse_secs(&get, "CAMPUS_WATCH_SECS", DEFAULT_WATCH_SECS)?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            access_token: get("CAMPUS_ACCESS_TOKEN"),
            refresh_token: get("CAMPUS_REFRESH_TOKEN"),
            request_timeout: Duration::from_secs(timeout_secs),
            watch_interval: Duration::from_secs(watch_secs),
        })
    }
}

fn parse_secs(get: impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            Error::Config(format!(
                "{key} must be a whole number of seconds, got '{raw}'"
            ))
        }),
    }
}
