//! Client configuration, defaults, and environment overrides.

use std::time::Duration;

/// Public Agent Pulse deployment used when no base URL is configured.
pub const DEFAULT_API_BASE_URL: &str = "https://agent-pulse-nine.vercel.app";

/// Per-attempt request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Additional attempts after the first one for retryable failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay before the first retry; doubles on every following retry.
pub const DEFAULT_BACKOFF_SECS: f64 = 0.5;

/// Identifying user-agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("agent-pulse/", env!("CARGO_PKG_VERSION"));

/// Settings shared by every request a [`crate::PulseClient`] makes.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseConfig {
    pub api_base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_secs: f64,
    /// Extra request headers, applied after the fixed `accept` and
    /// `user-agent` headers (a header with the same name replaces them).
    pub headers: Vec<(String, String)>,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_secs: DEFAULT_BACKOFF_SECS,
            headers: Vec::new(),
        }
    }
}

impl PulseConfig {
    /// Load configuration from `AGENT_PULSE_*` environment variables.
    ///
    /// Unset or unparseable variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`PulseConfig::from_env`] with an explicit variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let api_base_url = lookup("AGENT_PULSE_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.api_base_url);

        Self {
            api_base_url,
            timeout_secs: read_parsed(&lookup, "AGENT_PULSE_TIMEOUT_SECS", defaults.timeout_secs),
            max_retries: read_parsed(&lookup, "AGENT_PULSE_MAX_RETRIES", defaults.max_retries),
            backoff_secs: read_parsed(&lookup, "AGENT_PULSE_BACKOFF_SECS", defaults.backoff_secs)
                .max(0.0),
            headers: defaults.headers,
        }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_backoff_secs(mut self, secs: f64) -> Self {
        self.backoff_secs = secs;
        self
    }

    /// Append one extra request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Per-attempt timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn read_parsed<T, F>(lookup: &F, name: &str, default_value: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default_value)
}
