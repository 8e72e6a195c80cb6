//! Inference engine for bot/human classification

use std::path::Path;
use tracing::debug;

use super::artifact::{ArtifactError, ModelArtifact};
use super::logistic::PredictionError;
use super::vocabulary::ClassLabels;
use crate::feature_extractor::{FeatureExtractor, FeatureVector};
use crate::types::prediction::Prediction;
use crate::types::telemetry::Telemetry;

/// Read-only classifier built from a validated artifact.
///
/// Holds no interior mutability, so a single instance can be shared across
/// request handlers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    artifact: ModelArtifact,
    extractor: FeatureExtractor,
}

impl InferenceEngine {
    /// Create an engine from an artifact, validating it first.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ArtifactError> {
        artifact.validate()?;
        let extractor = FeatureExtractor::new(artifact.thresholds, artifact.vocabulary.clone());
        Ok(Self {
            artifact,
            extractor,
        })
    }

    /// Load an artifact file and build an engine from it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        Self::from_artifact(ModelArtifact::load(path)?)
    }

    /// Classify one telemetry record.
    pub fn predict(&self, telemetry: &Telemetry) -> Result<Prediction, PredictionError> {
        let features = self.extractor.extract(telemetry);
        self.predict_features(&features)
    }

    /// Classify an already-encoded feature vector.
    pub fn predict_features(&self, features: &FeatureVector) -> Result<Prediction, PredictionError> {
        self.predict_raw(features.as_slice())
    }

    /// Classify a raw positional feature slice.
    pub fn predict_raw(&self, features: &[f64]) -> Result<Prediction, PredictionError> {
        let (class_code, probability) = self.artifact.classifier.score(features)?;
        let prediction = Prediction::new(class_code, probability, &self.artifact.classes);

        debug!(
            model_id = %self.artifact.model_id,
            probability = probability,
            class = prediction.class_code,
            label = %prediction.label,
            "Inference complete"
        );

        Ok(prediction)
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn classes(&self) -> &ClassLabels {
        &self.artifact.classes
    }

    pub fn model_id(&self) -> &str {
        &self.artifact.model_id
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }
}
