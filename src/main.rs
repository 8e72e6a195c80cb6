//! Bot Detection Service - Main Entry Point
//!
//! Loads the trained artifact once and serves `POST /predict`.

use anyhow::{Context, Result};
use bot_detection::{
    api::{create_router, shutdown_signal, AppState, ModelState},
    config::{AppConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH},
    logging::init_tracing,
    metrics::MetricsReporter,
};
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "bot-detection-service")]
#[command(about = "Serve bot/human predictions over HTTP", long_about = None)]
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

    info!(config = %cli.config, "Starting Bot Detection Service");

    let model = ModelState::load(&config.model.artifact_path);
    if let ModelState::Ready(engine) = &model {
        info!(
            "Feature extractor ready ({} features, thresholds {:?})",
            engine.extractor().feature_count(),
            engine.extractor().thresholds()
        );
    }

    let state = AppState::new(model);
    let metrics = state.metrics.clone();

    let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
    tokio::spawn(reporter.start());

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
    info!(addr = %listener.local_addr()?, "Listening for POST /predict");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
