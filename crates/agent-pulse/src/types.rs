//! Core data types for pulse status and errors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalized liveness status of one agent, as reported by Agent Pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPulseStatus {
    pub address: String,
    pub alive: Option<bool>,
    /// Unix seconds of the most recent pulse.
    pub last_pulse_timestamp: Option<i64>,
    pub streak_count: Option<i64>,
    /// The decoded response body, untouched.
    pub raw: Map<String, Value>,
}

impl AgentPulseStatus {
    /// Seconds elapsed since the last pulse, clamped at zero for timestamps
    /// in the future. `None` when the service reported no timestamp.
    pub fn staleness(&self, now: i64) -> Option<i64> {
        self.last_pulse_timestamp
            .map(|ts| now.saturating_sub(ts).max(0))
    }
}

/// Errors that can occur while checking agent liveness.
#[derive(thiserror::Error, Debug)]
pub enum PulseError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Agent Pulse request failed for {url}: {message}")]
    Request {
        url: String,
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
        /// Response body truncated for diagnostics.
        body: Option<String>,
        message: String,
    },
}

impl PulseError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        PulseError::InvalidArgument(msg.into())
    }

    /// HTTP status carried by a request error.
    pub fn status(&self) -> Option<u16> {
        match self {
            PulseError::Request { status, .. } => *status,
            PulseError::InvalidArgument(_) => None,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, PulseError::InvalidArgument(_))
    }
}

/// Convenience result type.
pub type PulseResult<T> = Result<T, PulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_with(ts: Option<i64>) -> AgentPulseStatus {
        AgentPulseStatus {
            address: "0xabc".to_string(),
            alive: None,
            last_pulse_timestamp: ts,
            streak_count: None,
            raw: Map::new(),
        }
    }

    #[test]
    fn test_staleness() {
        assert_eq!(status_with(Some(500)).staleness(1000), Some(500));
        assert_eq!(status_with(Some(2000)).staleness(1000), Some(0));
        assert_eq!(status_with(None).staleness(1000), None);
    }

    #[test]
    fn test_request_error_display() {
        let err = PulseError::Request {
            url: "http://x/api".to_string(),
            status: Some(404),
            body: Some("missing".to_string()),
            message: "HTTP 404. Body: missing".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_invalid_argument());
        let text = err.to_string();
        assert!(text.contains("http://x/api"));
        assert!(text.contains("HTTP 404"));
    }

    #[test]
    fn test_invalid_argument() {
        let err = PulseError::invalid("threshold must be > 0");
        assert!(err.is_invalid_argument());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Invalid argument: threshold must be > 0");
    }
}
