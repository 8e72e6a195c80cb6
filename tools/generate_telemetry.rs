//! Synthetic Telemetry Generator
//!
//! Writes a labeled telemetry CSV in the training layout, for local training
//! runs when no captured data is at hand.

use anyhow::{bail, Context, Result};
use bot_detection::types::telemetry::TelemetryRow;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "generate-telemetry")]
#[command(about = "Generate a synthetic labeled telemetry dataset", long_about = None)]
struct Cli {
    /// Number of rows to write
    #[arg(long, default_value = "1000")]
    rows: usize,

    /// Output CSV path
    #[arg(long, default_value = "data/data.csv")]
    output: PathBuf,

    /// Fraction of rows labeled `bot`
    #[arg(long, default_value = "0.3")]
    bot_ratio: f64,

    /// Random seed
    #[arg(long, default_value = "100")]
    seed: u64,
}

/// Telemetry generator
struct TelemetryGenerator {
    rng: StdRng,
}

impl TelemetryGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A session with human-looking interaction
    fn generate_human(&mut self) -> TelemetryRow {
        TelemetryRow {
            mouse_movements: self.rng.gen_range(120..900).to_string(),
            screen_width: self.random_choice(&["1920", "1536", "2560", "1440", "1366"]).to_string(),
            screen_height: self.random_choice(&["1080", "864", "1440", "900", "768"]).to_string(),
            clicks: self.rng.gen_range(3..15).to_string(),
            time_on_page: format!("{:.1}", self.rng.gen_range(8.0..300.0)),
            key_presses: self.rng.gen_range(0..150).to_string(),
            language: self.random_choice(&["en-GB", "en-GB", "en-US", "de-DE", "fr-FR"]).to_string(),
            browser_name: self.random_choice(&["Chrome", "Firefox", "Safari", "Edge"]).to_string(),
            user_agent: self
                .random_choice(&[
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64)",
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)",
                    "Mozilla/5.0 (X11; Linux x86_64)",
                ])
                .to_string(),
            referrer: self
                .random_choice(&["https://www.google.com/", "direct", "https://www.bing.com/"])
                .to_string(),
            label: "human".to_string(),
        }
    }

    /// A scripted session: little mouse activity, short visits
    fn generate_bot(&mut self) -> TelemetryRow {
        let clicks = if self.rng.gen_bool(0.5) {
            self.rng.gen_range(0..3)
        } else {
            self.rng.gen_range(20..60)
        };

        TelemetryRow {
            mouse_movements: self.rng.gen_range(0..60).to_string(),
            screen_width: self.random_choice(&["800", "1024", "1280"]).to_string(),
            screen_height: self.random_choice(&["600", "768"]).to_string(),
            clicks: clicks.to_string(),
            time_on_page: format!("{:.1}", self.rng.gen_range(0.0..8.0)),
            key_presses: self.rng.gen_range(0..5).to_string(),
            language: self.random_choice(&["en-US", ""]).to_string(),
            browser_name: self.random_choice(&["HeadlessChrome", "PhantomJS", "Chrome"]).to_string(),
            user_agent: self
                .random_choice(&["python-requests/2.31", "curl/8.4.0", "Mozilla/5.0 HeadlessChrome"])
                .to_string(),
            referrer: self.random_choice(&["", "direct"]).to_string(),
            label: "bot".to_string(),
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("generate_telemetry=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    if !(0.0..=1.0).contains(&cli.bot_ratio) {
        bail!("--bot-ratio must be within [0, 1], got {}", cli.bot_ratio);
    }

    if let Some(parent) = cli.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(&cli.output)
        .with_context(|| format!("Failed to open {}", cli.output.display()))?;

    let mut generator = TelemetryGenerator::new(cli.seed);
    let mut human_count = 0;
    let mut bot_count = 0;

    for _ in 0..cli.rows {
        let row = if generator.rng.gen_bool(cli.bot_ratio) {
            bot_count += 1;
            generator.generate_bot()
        } else {
            human_count += 1;
            generator.generate_human()
        };
        writer.serialize(&row)?;
    }
    writer.flush()?;

    info!(
        output = %cli.output.display(),
        rows = cli.rows,
        human = human_count,
        bot = bot_count,
        seed = cli.seed,
        "Synthetic dataset written"
    );

    Ok(())
}
