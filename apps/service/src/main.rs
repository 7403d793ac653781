use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

use heartbeat::{Config, Heartbeat};

#[derive(Debug, Parser)]
#[command(version, about = "Periodic health checks with failure alerts")]
struct Cli {
    /// Configuration file; defaults to heartbeat/config.toml in the user config directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logger::init();

    let cli = Cli::parse();
    let config = Config::from_config(cli.config.as_deref())?;
    debug!("Loaded configuration:\n{config}");

    let heartbeat = Heartbeat::builder(config).build().await?;

    if cli.once {
        let summary = heartbeat.run_cycle().await;
        info!(
            "Single cycle complete: {} jobs ok, {} failed, {} results",
            summary.completed, summary.failed, summary.results
        );
        return Ok(());
    }

    heartbeat.start().await?;
    Ok(())
}
