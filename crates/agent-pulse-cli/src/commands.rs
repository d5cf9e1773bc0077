//! Subcommand implementations.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

use agent_pulse::filter::unix_now;
use agent_pulse::{parse_threshold, AgentPulseStatus, FilterOptions, PulseClient, Threshold};

/// Fetch and print each address's status; fails if any fetch failed.
pub async fn status(client: &PulseClient, addresses: &[String]) -> Result<()> {
    let now = unix_now();
    let mut failed = 0usize;

    for address in addresses {
        match client.get_agent_status(address).await {
            Ok(status) => println!("{}", serde_json::to_string_pretty(&status_report(&status, now))?),
            Err(e) => {
                failed += 1;
                eprintln!("{address}: {e}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} status checks failed", addresses.len());
    }
    Ok(())
}

/// Filter agents and print the survivors as a JSON array.
pub async fn filter(
    client: &PulseClient,
    agents: Vec<Value>,
    threshold: Threshold,
    options: FilterOptions,
    concurrency: usize,
) -> Result<()> {
    let total = agents.len();
    let alive = if concurrency > 1 {
        client
            .filter_alive_agents_concurrent(agents, threshold.hours(), options, concurrency)
            .await?
    } else {
        client
            .filter_alive_agents(agents, threshold.hours(), options)
            .await?
    };

    tracing::info!("{} of {total} agents pulsed within {threshold}", alive.len());
    println!("{}", serde_json::to_string_pretty(&alive)?);
    Ok(())
}

/// Print a parsed threshold.
pub fn threshold(value: &str) -> Result<()> {
    let hours = parse_threshold(value)?;
    println!("{hours} hours ({} seconds)", Threshold::new(hours)?.seconds());
    Ok(())
}

/// Collect agents from positional addresses followed by the contents of a
/// JSON file (an array, or a single agent).
pub fn load_agents(addresses: Vec<String>, file: Option<&Path>) -> Result<Vec<Value>> {
    let mut agents: Vec<Value> = addresses.into_iter().map(Value::String).collect();

    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let parsed: Value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        match parsed {
            Value::Array(items) => agents.extend(items),
            single @ (Value::String(_) | Value::Object(_)) => agents.push(single),
            other => bail!("{}: expected an array of agents, got {other}", path.display()),
        }
    }

    if agents.is_empty() {
        bail!("no agents given; pass addresses or --file");
    }
    Ok(agents)
}

fn status_report(status: &AgentPulseStatus, now: i64) -> Value {
    let last_pulse = status
        .last_pulse_timestamp
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.to_rfc3339());

    json!({
        "address": status.address,
        "alive": status.alive,
        "last_pulse_timestamp": status.last_pulse_timestamp,
        "last_pulse": last_pulse,
        "staleness_secs": status.staleness(now),
        "streak_count": status.streak_count,
        "raw": status.raw,
    })
}
