//! wsbridge - WebSocket to TCP bridge with PROXY protocol v1 support

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wsbridge::bridge::Bridge;
use wsbridge::cli::Cli;
use wsbridge::config::Config;
use wsbridge::server::Server;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.quiet);

    let config = Config::from_cli(&cli).context("Invalid configuration")?;

    info!(
        listen = %config.listen_address,
        upstream = %format!("{}:{}", config.upstream_host, config.upstream_port),
        buffer_size = config.buffer_size,
        "Starting wsbridge"
    );

    let bridge = Arc::new(Bridge::new(&config));

    let mut server = Server::new(&config.listen_address);
    server.bind().await?;

    // Flip the shutdown signal on Ctrl+C
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    server.run(bridge, shutdown_rx).await?;

    info!("Shutdown complete");
    Ok(())
}

/// Initialize logging with tracing-subscriber
fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else if quiet {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
