//! # Main — CLI Entry Point
//!
//! `ticketmail --day` or `ticketmail --night`: mail ticket holders of
//! today's daytime or nighttime shows. Exactly one of the two flags is
//! required; anything else is a usage error.
//!
//! ## Environment
//!
//! - `USERNAME` / `PASSWORD`: admin site login (required).
//! - `TICKETMAIL_DATABASE`, `TICKETMAIL_TEMPLATES`, `TICKETCO_BASE_URL`:
//!   optional overrides, see `config`.
//! - `LOG_FORMAT=json`: JSON log lines instead of human-readable output.
//! - `RUST_LOG`: log filter (default `info`).
//!
//! A `.env` file in the working directory is loaded first.

use anyhow::Result;
use clap::{ArgGroup, Parser};
use ticketmail::{config::Config, orchestrator, RunMode};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ticketmail",
    about = "Mail ticket holders of today's shows, once per show"
)]
#[command(group(ArgGroup::new("mode").required(true).args(["day", "night"])))]
struct Cli {
    /// Check and mail for today's daytime shows
    #[arg(long)]
    day: bool,

    /// Check and mail for today's nighttime shows
    #[arg(long)]
    night: bool,
}

impl Cli {
    fn mode(&self) -> RunMode {
        if self.day {
            RunMode::Daytime
        } else {
            RunMode::Nighttime
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(orchestrator::execute(&config, cli.mode()))?;
    info!(
        scanned = summary.scanned,
        worklist = summary.worklist,
        sent = summary.sent,
        "run complete"
    );
    Ok(())
}
