//! accrual-daemon: embeds the accrual ledger in a single process.
//!
//! Usage:
//!   accrual-daemon                         # Print the resolved configuration
//!   accrual-daemon replay <scenario.toml>  # Replay a scenario, print a JSON report

mod config;
mod events;
mod replay;

use std::path::PathBuf;

use anyhow::{anyhow, bail};
use tracing::info;

use crate::config::DaemonConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("accrual={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "accrual daemon starting");

    // 3. Dispatch
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Some("replay") => {
            let path = args
                .get(1)
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("usage: accrual-daemon replay <scenario.toml>"))?;
            let report = replay::run_file(&config, &path).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(other) => bail!("unknown command: {other}"),
    }

    info!("accrual daemon stopped");
    Ok(())
}
