//! Sync configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_POLL_MIN_MS: u64 = 8_000;
pub const DEFAULT_POLL_MAX_MS: u64 = 10_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Backend origin, without a trailing slash.
    pub base_url: String,
    /// Lower bound of the jittered poll interval, in milliseconds.
    pub poll_min_ms: u64,
    /// Upper bound of the jittered poll interval, in milliseconds.
    pub poll_max_ms: u64,
    /// Substitute demo peers when a peer fetch fails (otherwise an empty set).
    pub fallback_mock: bool,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_min_ms: DEFAULT_POLL_MIN_MS,
            poll_max_ms: DEFAULT_POLL_MAX_MS,
            fallback_mock: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl SyncConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `ANNOTATE_BASE_URL`: default `http://127.0.0.1:8000`
    /// - `ANNOTATE_POLL_MIN_MS`: default 8000
    /// - `ANNOTATE_POLL_MAX_MS`: default 10000
    /// - `ANNOTATE_FALLBACK_MOCK`: `true` (default) or `false`
    /// - `ANNOTATE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `ANNOTATE_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// Unparseable values fall back to their defaults with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(v) => Some(v),
            Err(_) => None,
        })
    }

    /// Same as [`SyncConfig::from_env`] but reads from `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("ANNOTATE_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let config = Self {
            base_url,
            poll_min_ms: parse_or(&lookup, "ANNOTATE_POLL_MIN_MS", DEFAULT_POLL_MIN_MS),
            poll_max_ms: parse_or(&lookup, "ANNOTATE_POLL_MAX_MS", DEFAULT_POLL_MAX_MS),
            fallback_mock: flag_or(&lookup, "ANNOTATE_FALLBACK_MOCK", true),
            request_timeout_secs: parse_or(&lookup, "ANNOTATE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout_secs: parse_or(&lookup, "ANNOTATE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        config.normalized()
    }

    /// Ensure `poll_min_ms <= poll_max_ms` and a non-zero interval.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.poll_min_ms == 0 {
            warn!("poll interval of 0ms raised to 1ms");
            self.poll_min_ms = 1;
        }
        if self.poll_max_ms < self.poll_min_ms {
            warn!(
                poll_min_ms = self.poll_min_ms,
                poll_max_ms = self.poll_max_ms,
                "poll max below min; using min for both"
            );
            self.poll_max_ms = self.poll_min_ms;
        }
        self
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            warn!(key, value = %raw, "unparseable config value; using default");
            default
        }
    }
}

fn flag_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(key, value = %raw, "unparseable flag; using default");
            default
        }
    }
}
