//! Agent Pulse API client.

use serde_json::Value;

use crate::address::normalize_address;
use crate::config::PulseConfig;
use crate::http::{truncate_body, HttpFetcher};
use crate::status::{normalize_status, status_url};
use crate::types::{AgentPulseStatus, PulseError, PulseResult};

/// Client bound to one Agent Pulse deployment.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct PulseClient {
    config: PulseConfig,
    fetcher: HttpFetcher,
}

impl PulseClient {
    pub fn new(config: PulseConfig) -> PulseResult<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self { config, fetcher })
    }

    /// Client configured from `AGENT_PULSE_*` environment variables.
    pub fn from_env() -> PulseResult<Self> {
        Self::new(PulseConfig::from_env())
    }

    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    /// Fetch and normalize the pulse status of one address.
    pub async fn get_agent_status(&self, address: &str) -> PulseResult<AgentPulseStatus> {
        let address = normalize_address(address)?;
        let url = status_url(&self.config.api_base_url, &address);

        match self.fetcher.get_json(&url).await? {
            Value::Object(payload) => {
                let status = normalize_status(address, payload);
                tracing::debug!(
                    address = %status.address,
                    alive = ?status.alive,
                    last_pulse = ?status.last_pulse_timestamp,
                    "agent pulse status"
                );
                Ok(status)
            }
            other => Err(PulseError::Request {
                url,
                status: None,
                body: Some(truncate_body(&other.to_string())),
                message: "expected a JSON object in the response".to_string(),
            }),
        }
    }
}

/// Fetch the status of one address with configuration from the environment.
pub async fn get_agent_status(address: &str) -> PulseResult<AgentPulseStatus> {
    PulseClient::from_env()?.get_agent_status(address).await
}
