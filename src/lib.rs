//! Bot Detection Library
//!
//! Classifies browsing sessions as bot or human from client telemetry. The
//! trainer fits a logistic regression over thresholded features and writes
//! a single JSON artifact; the prediction service and collector load it.

pub mod api;
pub mod collector;
pub mod config;
pub mod feature_extractor;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod training;
pub mod types;

pub use config::AppConfig;
pub use feature_extractor::{FeatureExtractor, FeatureVector, Thresholds};
pub use models::inference::InferenceEngine;
pub use training::{Trainer, TrainingError, TrainingOptions};
pub use types::{telemetry::Telemetry, telemetry::TelemetryRequest};
