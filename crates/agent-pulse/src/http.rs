//! JSON GET over reqwest with retry and exponential backoff.
//!
//! Retries 408, 429, 5xx and transport failures; everything else fails on the
//! first attempt. The classification and delay math are plain functions so
//! they can be checked without a server.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;

use crate::config::{PulseConfig, DEFAULT_USER_AGENT};
use crate::types::{PulseError, PulseResult};

/// Longest response body excerpt kept in a request error.
pub const MAX_ERROR_BODY_CHARS: usize = 200;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_secs: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &PulseConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_secs: config.backoff_secs,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        backoff_delay(self.backoff_secs, attempt)
    }
}

/// Whether an HTTP status is worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

/// `backoff_secs * 2^attempt`, as a [`Duration`].
///
/// Delays too large for a `Duration` saturate at [`Duration::MAX`]; negative
/// or NaN inputs yield no delay.
pub fn backoff_delay(backoff_secs: f64, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let secs = backoff_secs * 2f64.powi(exponent);
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// First [`MAX_ERROR_BODY_CHARS`] characters of a response body.
pub fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Fixed `accept`/`user-agent` headers followed by caller headers.
///
/// A caller header with the same name as a fixed one replaces it.
pub fn build_headers(extra: &[(String, String)]) -> PulseResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| PulseError::invalid(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| PulseError::invalid(format!("invalid value for header {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// A failed attempt and whether the retry loop may try again.
#[derive(Debug)]
struct AttemptFailure {
    error: PulseError,
    retryable: bool,
}

/// HTTP client for the Agent Pulse API.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    headers: HeaderMap,
    timeout: Duration,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Create a fetcher from client configuration.
    ///
    /// Fails only when an extra header cannot be encoded.
    pub fn new(config: &PulseConfig) -> PulseResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_default();

        Ok(Self {
            client,
            headers: build_headers(&config.headers)?,
            timeout: config.timeout(),
            policy: RetryPolicy::from_config(config),
        })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// GET `url` and decode the body as JSON, retrying transient failures.
    pub async fn get_json(&self, url: &str) -> PulseResult<Value> {
        let mut attempt = 0u32;

        loop {
            tracing::debug!(url, attempt, "agent pulse GET");

            let failure = match self.attempt(url).await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            if !failure.retryable || attempt >= self.policy.max_retries {
                return Err(failure.error);
            }

            let delay = self.policy.delay(attempt);
            tracing::warn!(
                url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying agent pulse request: {}",
                failure.error
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, url: &str) -> Result<Value, AttemptFailure> {
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AttemptFailure {
                retryable: !e.is_builder(),
                error: transport_error(url, &e),
            })?;

        let status = response.status().as_u16();
        let success = (200..300).contains(&status);
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if success => {
                return Err(AttemptFailure {
                    retryable: true,
                    error: transport_error(url, &e),
                })
            }
            // the status already decides the outcome
            Err(e) => {
                tracing::debug!(url, status, "failed to read error body: {e}");
                String::new()
            }
        };

        if !success {
            let excerpt = truncate_body(&body);
            return Err(AttemptFailure {
                retryable: is_retryable_status(status),
                error: PulseError::Request {
                    url: url.to_string(),
                    status: Some(status),
                    message: format!("HTTP {status}. Body: {excerpt}"),
                    body: Some(excerpt),
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| AttemptFailure {
            retryable: false,
            error: PulseError::Request {
                url: url.to_string(),
                status: Some(status),
                message: format!("response is not valid JSON: {e}"),
                body: Some(truncate_body(&body)),
            },
        })
    }
}

fn transport_error(url: &str, e: &reqwest::Error) -> PulseError {
    PulseError::Request {
        url: url.to_string(),
        status: None,
        body: None,
        message: e.to_string(),
    }
}
