//! Held-out evaluation of a fitted classifier

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::feature_extractor::FeatureVector;
use crate::models::logistic::{LogisticRegression, PredictionError};

/// Confusion counts, class 1 taken as positive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    pub fn record(&mut self, predicted: u8, actual: u8) {
        match (predicted, actual) {
            (1, 1) => self.true_positive += 1,
            (1, _) => self.false_positive += 1,
            (_, 1) => self.false_negative += 1,
            _ => self.true_negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

/// Metrics on the test partition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
}

impl EvaluationReport {
    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        let samples = confusion.total();
        let accuracy = ratio(confusion.true_positive + confusion.true_negative, samples);
        let precision = ratio(
            confusion.true_positive,
            confusion.true_positive + confusion.false_positive,
        );
        let recall = ratio(
            confusion.true_positive,
            confusion.true_positive + confusion.false_negative,
        );
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            samples,
            accuracy,
            precision,
            recall,
            f1,
            confusion,
        }
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} acc={:.3} precision={:.3} recall={:.3} f1={:.3} (tp={} fp={} tn={} fn={})",
            self.samples,
            self.accuracy,
            self.precision,
            self.recall,
            self.f1,
            self.confusion.true_positive,
            self.confusion.false_positive,
            self.confusion.true_negative,
            self.confusion.false_negative
        )
    }
}

/// Score a model against labeled feature vectors.
pub fn evaluate(
    model: &LogisticRegression,
    features: &[FeatureVector],
    targets: &[u8],
) -> Result<EvaluationReport, PredictionError> {
    let mut confusion = ConfusionMatrix::default();
    for (x, &y) in features.iter().zip(targets) {
        confusion.record(model.predict(x.as_slice())?, y);
    }
    Ok(EvaluationReport::from_confusion(confusion))
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
