//! Type definitions for telemetry records and classification results

pub mod prediction;
pub mod telemetry;

pub use prediction::{CaptureResponse, ErrorBody, Prediction, PredictionResponse};
pub use telemetry::{InputError, Telemetry, TelemetryRequest, TelemetryRow};
