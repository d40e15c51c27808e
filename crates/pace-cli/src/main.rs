//! Pace load driver binary
//!
//! Pushes synthetic events through a meter so its reporters can be watched
//! under changing load.

mod cli;
mod config;
mod driver;

use anyhow::Result;
use cli::Cli;
use config::load_config_file;
use pace_meter::Meter;
use std::future::Future;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => {
            let config = cli.driver_config();
            config.validate()?;
            config
        }
    };

    let meter = Meter::from_config(&config.meter)?;
    tracing::info!(
        "Metering {:?} every {:?} over {} phases",
        meter.label(),
        meter.interval(),
        config.phases.len()
    );

    tokio::select! {
        total = driver::run(&meter, &config) => {
            tracing::info!("Load finished after {} steps", total);
        }
        _ = shutdown_signal(tokio::signal::ctrl_c()) => {
            tracing::info!("Shutdown signal received");
        }
    }

    meter.report();
    meter.shutdown();

    tracing::info!("Pace driver stopped");

    Ok(())
}

/// Resolve once `signal` fires. If the handler cannot be installed, log it
/// and never resolve, so the load run is not cut short.
async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
