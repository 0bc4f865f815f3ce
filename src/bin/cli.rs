//! mecm2m CLI - ask a running node to resolve virtual references.
//!
//! Usage:
//!   mecm2m point --sw 35.0,139.0 --ne 35.1,139.1   # virtual points in a box
//!   mecm2m node psinkA temp humidity               # nodes behind a sink
//!
//! Results are printed as JSON on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mecm2m::{Config, EndpointRole, GeoPoint, NodeQuery, PointQuery, ResolverClient};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mecm2m")]
#[command(about = "Resolve virtual sensor/actuator references through a MEC node", long_about = None)]
struct Cli {
    /// API socket to connect to (default: the api endpoint from config)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// TOML config file used to find the api endpoint
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Virtual points strictly inside a rectangle
    Point {
        /// South-west corner as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        sw: GeoPoint,

        /// North-east corner as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        ne: GeoPoint,
    },

    /// Physical nodes behind a sink offering one of the capabilities
    Node {
        /// Source (sink) identifier
        source: String,

        /// Capability labels
        #[arg(required = true)]
        capabilities: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let socket = match cli.socket {
        Some(path) => path,
        None => {
            let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
            config
                .endpoint(EndpointRole::Api)
                .map(|e| e.path.clone())
                .context("no api endpoint configured")?
        }
    };

    let mut client = ResolverClient::connect(&socket)?;
    let output = match cli.command {
        Commands::Point { sw, ne } => {
            let points = client.resolve(&PointQuery { sw, ne })?;
            serde_json::to_string_pretty(&points)?
        }
        Commands::Node { source, capabilities } => {
            let nodes = client.resolve(&NodeQuery {
                source_id: source,
                capabilities,
            })?;
            serde_json::to_string_pretty(&nodes)?
        }
    };
    println!("{}", output);
    Ok(())
}
