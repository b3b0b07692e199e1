use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use quorum_models::config::QuorumConfig;
use quorum_models::records::TradeStatus;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "quorum", about = "Five-persona trading committee")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/quorum.toml", global = true)]
    config: String,

    /// Pretty-print the output JSON
    #[arg(long, global = true)]
    pretty: bool,

    /// Emit logs on stderr as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one decision round on a request read from a file or stdin
    Decide {
        /// Read the DecisionRequest JSON from a file instead of stdin
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Show the most recent decisions
    Decisions {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show trade signals with the given status
    Trades {
        /// PENDING, EXECUTED or FAILED
        #[arg(short, long, default_value = "PENDING")]
        status: String,
    },
    /// Show stored snapshots for a market
    History {
        #[arg(short, long)]
        market: String,
    },
}

fn load_config(path: &str) -> Result<QuorumConfig> {
    if !Path::new(path).exists() {
        info!(path = %path, "Config file not found, using defaults");
        return Ok(QuorumConfig::default());
    }
    let config_str =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config: {path}"))?;
    toml::from_str(&config_str).with_context(|| format!("Failed to parse config: {path}"))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (respects RUST_LOG env var)
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = load_config(&cli.config)?;

    match cli.command {
        Command::Decide { input } => {
            let request_json = if let Some(input_path) = &input {
                std::fs::read_to_string(input_path)
                    .with_context(|| format!("Failed to read input: {input_path}"))?
            } else {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read from stdin")?;
                buf
            };

            let service = quorum::build_service(&config).context("Failed to build service")?;
            let response = service.process_json(&request_json).await;
            print_json(&response, cli.pretty)?;

            if !response.is_ok() {
                bail!(
                    "Decision failed: {}",
                    response.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        Command::Decisions { limit } => {
            let logger = open_logger(&config)?;
            print_json(&logger.latest_decisions(limit)?, cli.pretty)?;
        }
        Command::Trades { status } => {
            let status = TradeStatus::parse(&status)
                .with_context(|| format!("Unknown trade status: {status}"))?;
            let logger = open_logger(&config)?;
            print_json(&logger.trades_by_status(status)?, cli.pretty)?;
        }
        Command::History { market } => {
            let logger = open_logger(&config)?;
            print_json(&logger.market_history(&market)?, cli.pretty)?;
        }
    }

    Ok(())
}

fn open_logger(config: &QuorumConfig) -> Result<std::sync::Arc<quorum_store::DecisionLogger>> {
    match quorum::build_logger(&config.store)? {
        Some(logger) => Ok(logger),
        None => bail!("Decision log is disabled (store.enabled = false)"),
    }
}
