//! Liveness filtering of candidate agents.
//!
//! Every agent goes through address extraction, a status fetch, and a
//! recency check against a shared `now`. Survivors are returned as the
//! original values, in input order.

use std::time::{SystemTime, UNIX_EPOCH};

use futures::stream::{self, StreamExt};

use crate::address::AgentAddress;
use crate::client::PulseClient;
use crate::threshold::{parse_threshold, threshold_seconds, ThresholdInput};
use crate::types::{AgentPulseStatus, PulseResult};

/// Batch behaviour for the filter operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    /// Exclude agents that cannot be checked instead of failing the batch.
    pub drop_on_error: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            drop_on_error: true,
        }
    }
}

impl FilterOptions {
    /// Fail the whole batch on the first agent that cannot be checked.
    pub fn strict() -> Self {
        Self {
            drop_on_error: false,
        }
    }
}

/// Whether `status` counts as alive at `now` given a staleness budget.
///
/// Without a timestamp the reported `alive` flag decides; an unknown flag
/// counts as not alive.
pub fn is_recent(status: &AgentPulseStatus, now: i64, threshold_seconds: i64) -> bool {
    match status.staleness(now) {
        Some(staleness) => staleness <= threshold_seconds,
        None => status.alive.unwrap_or(false),
    }
}

/// Current Unix time in whole seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

impl PulseClient {
    /// Keep the agents that pulsed within `threshold` ("24h", "15m", or hours).
    pub async fn filter_alive<A, I>(
        &self,
        agents: I,
        threshold: impl Into<ThresholdInput>,
        options: FilterOptions,
    ) -> PulseResult<Vec<A>>
    where
        A: AgentAddress,
        I: IntoIterator<Item = A>,
    {
        let hours = parse_threshold(threshold)?;
        self.filter_alive_agents(agents, hours, options).await
    }

    /// Keep the agents that pulsed within `threshold_hours`.
    pub async fn filter_alive_agents<A, I>(
        &self,
        agents: I,
        threshold_hours: f64,
        options: FilterOptions,
    ) -> PulseResult<Vec<A>>
    where
        A: AgentAddress,
        I: IntoIterator<Item = A>,
    {
        self.filter_alive_agents_with(agents, threshold_hours, options, |agent: &A| {
            agent.extract_address()
        })
        .await
    }

    /// Like [`PulseClient::filter_alive_agents`], with a caller-supplied
    /// address extractor in place of [`AgentAddress`].
    pub async fn filter_alive_agents_with<A, I, G>(
        &self,
        agents: I,
        threshold_hours: f64,
        options: FilterOptions,
        address_of: G,
    ) -> PulseResult<Vec<A>>
    where
        I: IntoIterator<Item = A>,
        G: Fn(&A) -> PulseResult<String>,
    {
        let threshold_secs = threshold_seconds(threshold_hours)?;
        let now = unix_now();
        let mut alive = Vec::new();

        for (index, agent) in agents.into_iter().enumerate() {
            let outcome = self
                .check_agent(&agent, now, threshold_secs, &address_of)
                .await;
            if keep(index, outcome, options)? {
                alive.push(agent);
            }
        }

        tracing::debug!(alive = alive.len(), threshold_secs, "liveness filter finished");
        Ok(alive)
    }

    /// Concurrent variant of [`PulseClient::filter_alive_agents`].
    ///
    /// Up to `concurrency` checks run at once. Results are applied in input
    /// order, so the output and the error reported in strict mode are the
    /// same as for the sequential filter.
    pub async fn filter_alive_agents_concurrent<A, I>(
        &self,
        agents: I,
        threshold_hours: f64,
        options: FilterOptions,
        concurrency: usize,
    ) -> PulseResult<Vec<A>>
    where
        A: AgentAddress,
        I: IntoIterator<Item = A>,
    {
        self.filter_alive_agents_concurrent_with(
            agents,
            threshold_hours,
            options,
            concurrency,
            |agent: &A| agent.extract_address(),
        )
        .await
    }

    /// Concurrent variant of [`PulseClient::filter_alive_agents_with`].
    pub async fn filter_alive_agents_concurrent_with<A, I, G>(
        &self,
        agents: I,
        threshold_hours: f64,
        options: FilterOptions,
        concurrency: usize,
        address_of: G,
    ) -> PulseResult<Vec<A>>
    where
        I: IntoIterator<Item = A>,
        G: Fn(&A) -> PulseResult<String>,
    {
        let threshold_secs = threshold_seconds(threshold_hours)?;
        let now = unix_now();
        let address_of = &address_of;

        let checked = stream::iter(agents)
            .map(|agent| async move {
                let outcome = self.check_agent(&agent, now, threshold_secs, address_of).await;
                (agent, outcome)
            })
            .buffered(concurrency.max(1));
        futures::pin_mut!(checked);

        // returning early drops the stream, cancelling checks still in flight
        let mut alive = Vec::new();
        let mut index = 0;
        while let Some((agent, outcome)) = checked.next().await {
            if keep(index, outcome, options)? {
                alive.push(agent);
            }
            index += 1;
        }

        tracing::debug!(alive = alive.len(), threshold_secs, "liveness filter finished");
        Ok(alive)
    }

    async fn check_agent<A, G>(
        &self,
        agent: &A,
        now: i64,
        threshold_secs: i64,
        address_of: &G,
    ) -> PulseResult<bool>
    where
        G: Fn(&A) -> PulseResult<String>,
    {
        let address = address_of(agent)?;
        let status = self.get_agent_status(&address).await?;
        let recent = is_recent(&status, now, threshold_secs);
        tracing::debug!(
            address = %status.address,
            staleness = ?status.staleness(now),
            recent,
            "agent checked"
        );
        Ok(recent)
    }
}

/// Apply the error policy to one agent's outcome.
fn keep(index: usize, outcome: PulseResult<bool>, options: FilterOptions) -> PulseResult<bool> {
    match outcome {
        Ok(recent) => Ok(recent),
        Err(e) if options.drop_on_error => {
            tracing::warn!(index, "dropping agent that could not be checked: {e}");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Filter `agents` against a human threshold using configuration from the
/// environment and the default (lenient) error policy.
pub async fn filter_alive<A, I>(agents: I, threshold: impl Into<ThresholdInput>) -> PulseResult<Vec<A>>
where
    A: AgentAddress,
    I: IntoIterator<Item = A>,
{
    PulseClient::from_env()?
        .filter_alive(agents, threshold, FilterOptions::default())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PulseConfig;
    use serde_json::Map;

    fn status(alive: Option<bool>, ts: Option<i64>) -> AgentPulseStatus {
        AgentPulseStatus {
            address: "0xabc".to_string(),
            alive,
            last_pulse_timestamp: ts,
            streak_count: None,
            raw: Map::new(),
        }
    }

    #[test]
    fn test_recent_by_timestamp() {
        assert!(is_recent(&status(None, Some(500)), 1000, 3600));
        assert!(!is_recent(&status(None, Some(0)), 1000, 100));
        assert!(is_recent(&status(None, Some(900)), 1000, 100));
        // timestamp wins over the flag
        assert!(!is_recent(&status(Some(true), Some(0)), 1000, 100));
    }

    #[test]
    fn test_future_timestamp_is_recent() {
        assert!(is_recent(&status(Some(false), Some(5000)), 1000, 1));
    }

    #[test]
    fn test_fallback_to_alive_flag() {
        assert!(is_recent(&status(Some(true), None), 1000, 3600));
        assert!(!is_recent(&status(Some(false), None), 1000, 3600));
        assert!(!is_recent(&status(None, None), 1000, 3600));
    }

    #[test]
    fn test_default_options() {
        assert!(FilterOptions::default().drop_on_error);
        assert!(!FilterOptions::strict().drop_on_error);
    }

    #[test]
    fn test_keep_policy() {
        let err = || crate::types::PulseError::invalid("no address");
        assert!(keep(0, Ok(true), FilterOptions::default()).unwrap());
        assert!(!keep(0, Err(err()), FilterOptions::default()).unwrap());
        assert!(keep(0, Err(err()), FilterOptions::strict()).is_err());
    }

    #[test]
    fn test_bad_threshold_rejected_before_any_request() {
        // nothing listens on the discard port; a request would surface as a transport error
        let client = PulseClient::new(
            PulseConfig::default()
                .with_api_base_url("http://127.0.0.1:9")
                .with_max_retries(0),
        )
        .unwrap();

        for hours in [0.0, -1.0, f64::NAN] {
            let err = tokio_test::block_on(client.filter_alive_agents(
                vec!["0xabc"],
                hours,
                FilterOptions::strict(),
            ))
            .unwrap_err();
            assert!(err.is_invalid_argument());
        }

        let err = tokio_test::block_on(client.filter_alive(vec!["0xabc"], "0h", FilterOptions::strict()))
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_empty_batch() {
        let client = PulseClient::new(PulseConfig::default()).unwrap();
        let alive: Vec<&str> =
            tokio_test::block_on(client.filter_alive_agents(Vec::<&str>::new(), 24.0, FilterOptions::strict()))
                .unwrap();
        assert!(alive.is_empty());
    }
}
