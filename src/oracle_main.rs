//! Roulette oracle binary
//!
//! Serves the randomness process over HTTP.

use clap::Parser;
use roulette::api::OracleServer;
use roulette::{ConfigLoader, VrfProcess};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "roulette-oracle")]
#[command(about = "Roulette randomness oracle", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Process id to answer to (overrides config)
    #[arg(long)]
    process_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(host) = args.host {
        config.oracle.host = host;
    }
    if let Some(port) = args.port {
        config.oracle.port = port;
    }
    if let Some(process_id) = args.process_id {
        config.oracle.process_id = process_id;
    }
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    let process = Arc::new(
        VrfProcess::with_random_key(config.oracle.process_id.clone())
            .with_max_records(config.oracle.max_rounds),
    );
    OracleServer::new(config.oracle, process).run().await
}
