//! Filter a list of candidate agents down to those that pulsed in the last day.
//!
//! Run with `cargo run -p agent-pulse --example filter_candidates`.
//! Set `AGENT_PULSE_API_URL` to point at another deployment.

use agent_pulse::{filter_alive, AgentAddress};

struct Candidate {
    name: String,
    wallet_address: String,
}

impl Candidate {
    fn new(name: &str, wallet_address: &str) -> Self {
        Self {
            name: name.to_string(),
            wallet_address: wallet_address.to_string(),
        }
    }
}

impl AgentAddress for Candidate {
    fn address_field(&self, name: &str) -> Option<&str> {
        match name {
            "wallet_address" => Some(&self.wallet_address),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let candidates = vec![
        Candidate::new("demo-alive", "0x9508752Ba171D37EBb3AA437927458E0a21D1e04"),
        Candidate::new("demo-unknown", "0x0000000000000000000000000000000000000000"),
    ];

    let alive = filter_alive(&candidates, "24h").await?;

    println!("Alive candidates:");
    for candidate in alive {
        println!("- {} ({})", candidate.name, candidate.wallet_address);
    }

    Ok(())
}
