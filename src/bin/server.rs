//! mecm2m-server - MEC server node.
//!
//! Usage:
//!   mecm2m-server                        # default /tmp/mecm2m layout
//!   mecm2m-server --config node.toml     # endpoints and backend from file
//!
//! Backend credentials can be overridden with NEO4J_USERNAME,
//! NEO4J_PASSWORD, NEO4J_PORT and MECM2M_BACKEND_URL.

use anyhow::{Context, Result};
use clap::Parser;
use mecm2m::{start_node, Config, InterruptWatch, Lifecycle};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mecm2m-server")]
#[command(about = "MEC server node resolving virtual sensor/actuator references", long_about = None)]
struct Cli {
    /// TOML config file (default: built-in layout)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!(error = %format!("{:#}", e), "server failed");
        std::process::exit(1);
    }
    std::process::exit(0);
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    // Before any socket exists, so Ctrl-C during startup still cleans up.
    let interrupt = InterruptWatch::install().context("installing interrupt handler")?;

    let lifecycle = Lifecycle::new(config.endpoint_paths());
    lifecycle.prepare().context("preparing socket paths")?;

    let handles = match start_node(&config) {
        Ok(handles) => handles,
        Err(e) => {
            lifecycle.cleanup();
            return Err(e).context("starting endpoints");
        }
    };
    info!(endpoints = handles.len(), "node running, Ctrl-C to stop");

    interrupt.wait();
    lifecycle.cleanup();
    info!("endpoint files removed, exiting");

    // Listener threads block in accept; exiting the process ends them.
    Ok(())
}
