//! Agent Pulse CLI — entry point.

mod commands;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use agent_pulse::{FilterOptions, PulseClient, PulseConfig, Threshold};

#[derive(Parser)]
#[command(
    name = "agent-pulse",
    about = "Check Agent Pulse liveness and filter agents that pulsed recently",
    version
)]
struct Cli {
    /// Agent Pulse API base URL.
    /// Also reads from AGENT_PULSE_API_URL env var.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Per-attempt request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Retries for 408/429/5xx responses and network errors.
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Delay before the first retry; doubles on each further retry.
    #[arg(long, global = true)]
    backoff_secs: Option<f64>,

    /// Extra request header as NAME=VALUE (repeatable).
    #[arg(long = "header", value_parser = parse_header, global = true)]
    headers: Vec<(String, String)>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the pulse status of one or more addresses as JSON.
    Status {
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// Print the agents that pulsed within the threshold.
    ///
    /// Agents come from positional addresses and/or a JSON file holding an
    /// array of address strings or objects with an address field.
    Filter {
        /// Maximum staleness: "90s", "15m", "24h", "2d".
        #[arg(short, long, default_value = "24h")]
        threshold: Threshold,

        /// Fail on the first agent that cannot be checked instead of skipping it.
        #[arg(long)]
        strict: bool,

        /// Number of agents checked at once.
        #[arg(long, default_value_t = 1)]
        concurrency: usize,

        /// JSON file with an array of agents.
        #[arg(short, long)]
        file: Option<PathBuf>,

        agents: Vec<String>,
    },

    /// Parse a threshold and print it in hours and seconds.
    Threshold { value: String },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   agent-pulse completions bash > ~/.local/share/bash-completion/completions/agent-pulse
    ///   agent-pulse completions zsh > ~/.zfunc/_agent-pulse
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

impl Cli {
    fn config(&self) -> PulseConfig {
        let mut config = PulseConfig::from_env();
        if let Some(url) = &self.api_url {
            config.api_base_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(secs) = self.backoff_secs {
            config.backoff_secs = secs;
        }
        config.headers.extend(self.headers.iter().cloned());
        config
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {raw:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config();

    match cli.command {
        Commands::Status { addresses } => {
            let client = PulseClient::new(config)?;
            commands::status(&client, &addresses).await?;
        }

        Commands::Filter {
            threshold,
            strict,
            concurrency,
            file,
            agents,
        } => {
            let client = PulseClient::new(config)?;
            let agents = commands::load_agents(agents, file.as_deref())?;
            let options = if strict {
                FilterOptions::strict()
            } else {
                FilterOptions::default()
            };
            commands::filter(&client, agents, threshold, options, concurrency).await?;
        }

        Commands::Threshold { value } => {
            commands::threshold(&value)?;
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "agent-pulse", &mut std::io::stdout());
        }
    }

    Ok(())
}
