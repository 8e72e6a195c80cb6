//! Trainer entry point
//!
//! Reads a labeled telemetry CSV, fits the classifier and writes the model
//! artifact. Exits non-zero if any stage fails; the previous artifact is left
//! in place in that case.

use anyhow::{Context, Result};
use bot_detection::{
    config::{AppConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH},
    logging::init_tracing,
    training::{Trainer, TrainingOptions},
};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "train-model")]
#[command(about = "Train the bot/human classifier from a telemetry CSV", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override the training dataset path
    #[arg(short, long)]
    data: Option<String>,

    /// Override the artifact output path
    #[arg(short, long)]
    output: Option<String>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_from_path(&cli.config)?;
    init_tracing(&config.logging, env!("CARGO_CRATE_NAME"))?;

    if let Some(data) = cli.data {
        config.training.dataset_path = data;
    }
    if let Some(output) = cli.output {
        config.model.artifact_path = output;
    }
    if let Some(seed) = cli.seed {
        config.training.seed = seed;
    }

    info!(
        dataset = %config.training.dataset_path,
        output = %config.model.artifact_path,
        seed = config.training.seed,
        "Starting training run"
    );

    let trainer = Trainer::new(TrainingOptions::from_config(&config));
    let outcome = trainer
        .run(&config.training.dataset_path, &config.model.artifact_path)
        .map_err(|e| {
            error!(stage = %e.stage(), error = %e, "Training failed");
            e
        })
        .context("Training failed")?;

    let report = &outcome.report;
    info!(
        model_id = %outcome.artifact.model_id,
        rows_loaded = report.rows_loaded,
        rows_dropped = report.rows_dropped,
        train_rows = report.train_rows,
        test_rows = report.test_rows,
        resampled = report.resampled,
        "Training complete"
    );
    info!("Test metrics: {}", report.evaluation);

    Ok(())
}
