//! `SiteGate` popup harness
//!
//! Opens the popup against a scripted background and prints the resulting
//! state as JSON on stdout. Logs go to stderr.

use clap::Parser;
use tracing::info;

use sitegate_core::config::load_config;
use sitegate_core::tracing_init::init_tracing;
use sitegate_popup::harness::{self, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    init_tracing(&config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting sitegate-popup harness");

    let report = harness::run(&args, &config).await?;
    let json = report.to_json()?;

    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}
