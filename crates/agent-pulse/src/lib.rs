//! Agent Pulse: check whether on-chain agents proved liveness recently and
//! filter candidate lists down to the live ones.

pub mod address;
pub mod client;
pub mod config;
pub mod filter;
pub mod http;
pub mod status;
pub mod threshold;
pub mod types;

pub use address::{normalize_address, AgentAddress, ADDRESS_KEYS};
pub use client::{get_agent_status, PulseClient};
pub use config::PulseConfig;
pub use filter::{filter_alive, is_recent, FilterOptions};
pub use http::{backoff_delay, is_retryable_status, HttpFetcher, RetryPolicy};
pub use status::{normalize_status, normalize_timestamp, status_url};
pub use threshold::{parse_threshold, parse_threshold_value, threshold_seconds, Threshold, ThresholdInput};
pub use types::*;
