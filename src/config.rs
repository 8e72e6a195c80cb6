//! Configuration management for the bot detection service and trainer

use crate::feature_extractor::Thresholds;
use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "BOT_DETECTION_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub collector: CollectorConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    /// Binarization thresholds used when training a new model
    pub thresholds: Thresholds,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// Prediction service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address for `POST /predict`
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Telemetry collector
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Socket address for `POST /store-data`
    pub listen_addr: String,
    /// CSV file captured telemetry is appended to
    pub capture_path: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            capture_path: "data/captured.csv".to_string(),
        }
    }
}

/// Model artifact location, shared by trainer and servers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub artifact_path: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: "models/trained_model_with_thresholds.json".to_string(),
        }
    }
}

/// Trainer settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Labeled telemetry CSV
    pub dataset_path: String,
    /// Fraction held out for evaluation, in `[0, 1)`
    pub test_ratio: f64,
    pub seed: u64,
    /// Inverse L2 regularization strength (C)
    pub regularization: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dataset_path: "data/data.csv".to_string(),
            test_ratio: 0.2,
            seed: 100,
            regularization: 1.0,
            max_iter: 100,
            tolerance: 1e-6,
        }
    }
}

/// Periodic metrics summary
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between summaries; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, or from the file named
    /// by `BOT_DETECTION_CONFIG`
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    ///
    /// A missing file is not an error: every section has defaults. Values can
    /// be overridden with `BOT_DETECTION__SECTION__KEY` environment variables.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("BOT_DETECTION")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can run with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.training.test_ratio) {
            bail!(
                "training.test_ratio must be in [0, 1), got {}",
                self.training.test_ratio
            );
        }
        if !(self.training.regularization.is_finite() && self.training.regularization > 0.0) {
            bail!(
                "training.regularization must be positive, got {}",
                self.training.regularization
            );
        }
        if self.training.max_iter == 0 {
            bail!("training.max_iter must be at least 1");
        }
        if let Err(msg) = self.thresholds.validate() {
            bail!("thresholds: {msg}");
        }
        Ok(())
    }
}
