//! Telemetry collector entry point: `POST /store-data`.

use anyhow::{Context, Result};
use bot_detection::{
    api::{shutdown_signal, ModelState},
    collector::{create_collector_router, CaptureWriter, CollectorState},
    config::{AppConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH},
    logging::init_tracing,
    metrics::MetricsReporter,
};
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "telemetry-collector")]
#[command(about = "Capture browser telemetry and answer with a bot/human verdict", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from_path(&cli.config)?;
    init_tracing(&config.logging, env!("CARGO_CRATE_NAME"))?;

    info!(config = %cli.config, "Starting Telemetry Collector");

    let state = CollectorState::new(
        ModelState::load(&config.model.artifact_path),
        CaptureWriter::new(&config.collector.capture_path),
    );
    let metrics = state.metrics.clone();
    tokio::spawn(MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs).start());

    let listener = tokio::net::TcpListener::bind(&config.collector.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.collector.listen_addr))?;
    info!(addr = %listener.local_addr()?, "Listening for POST /store-data");

    axum::serve(listener, create_collector_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Collector shutting down...");
    metrics.print_summary();

    Ok(())
}
