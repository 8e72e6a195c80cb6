//! Classification results and their wire representations

use serde::{Deserialize, Serialize};

use crate::models::vocabulary::ClassLabels;

/// Outcome of classifying one telemetry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Encoded class (0 or 1), as returned by `/predict`
    pub class_code: u8,

    /// Class name the code stood for in the training labels
    pub label: String,

    /// Probability of class 1
    pub probability: f64,
}

impl Prediction {
    /// Attach the class name for `class_code` from the training labels.
    pub fn new(class_code: u8, probability: f64, classes: &ClassLabels) -> Self {
        let label = classes
            .name(class_code)
            .map(str::to_string)
            .unwrap_or_else(|| class_code.to_string());

        Self {
            class_code,
            label,
            probability,
        }
    }
}

/// Body of a successful `/predict` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: u8,
}

impl From<&Prediction> for PredictionResponse {
    fn from(prediction: &Prediction) -> Self {
        Self {
            prediction: prediction.class_code,
        }
    }
}

/// Body of a successful `/store-data` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureResponse {
    pub message: String,
    /// Class name, e.g. `"bot"` or `"human"`
    pub prediction: String,
}

/// JSON error body shared by every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
