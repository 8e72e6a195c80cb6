//! Model artifact persistence
//!
//! The artifact is a single JSON document carrying everything inference needs
//! besides the code: coefficients, feature order, thresholds, categorical
//! vocabularies and class names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use super::logistic::LogisticRegression;
use super::vocabulary::{CategoricalVocabularies, ClassLabels};
use crate::feature_extractor::{Thresholds, FEATURE_COUNT, FEATURE_NAMES};
use crate::training::evaluation::EvaluationReport;

/// Current artifact layout version.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Errors raised while loading, validating or writing an artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid artifact: {0}")]
    Invalid(String),
}

/// Serialized fitted classifier plus its feature contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    /// Unique identifier of this training run
    pub model_id: String,
    pub trained_at: DateTime<Utc>,
    /// Feature names in coefficient order
    pub feature_names: Vec<String>,
    pub thresholds: Thresholds,
    pub vocabulary: CategoricalVocabularies,
    /// Class names; class code `i` is `classes[i]`
    pub classes: ClassLabels,
    pub classifier: LogisticRegression,
    /// Held-out evaluation of the fitted model
    #[serde(default)]
    pub evaluation: Option<EvaluationReport>,
    /// Rows the classifier was fitted on (after balancing and splitting)
    #[serde(default)]
    pub training_rows: usize,
}

impl ModelArtifact {
    /// Bundle freshly fitted parts into a new artifact.
    pub fn new(
        thresholds: Thresholds,
        vocabulary: CategoricalVocabularies,
        classes: ClassLabels,
        classifier: LogisticRegression,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_id: uuid::Uuid::new_v4().to_string(),
            trained_at: Utc::now(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            thresholds,
            vocabulary,
            classes,
            classifier,
            evaluation: None,
            training_rows: 0,
        }
    }

    /// Attach the held-out evaluation and training size.
    pub fn with_evaluation(mut self, evaluation: EvaluationReport, training_rows: usize) -> Self {
        self.evaluation = Some(evaluation);
        self.training_rows = training_rows;
        self
    }

    /// Check that the artifact is structurally sound.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let invalid = |msg: String| Err(ArtifactError::Invalid(msg));

        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return invalid(format!(
                "unsupported format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            ));
        }
        if self.feature_names.len() != FEATURE_COUNT
            || self
                .feature_names
                .iter()
                .zip(FEATURE_NAMES.iter())
                .any(|(a, b)| a != b)
        {
            return invalid(format!(
                "feature order {:?} does not match {:?}",
                self.feature_names, FEATURE_NAMES
            ));
        }
        if self.classifier.feature_count() != FEATURE_COUNT {
            return invalid(format!(
                "weight dimension mismatch: expected {}, got {}",
                FEATURE_COUNT,
                self.classifier.feature_count()
            ));
        }
        if !self.classifier.is_finite() {
            return invalid("non-finite coefficients".to_string());
        }
        if self.classes.len() != 2 {
            return invalid(format!(
                "expected 2 classes, got {}",
                self.classes.len()
            ));
        }
        if !self.vocabulary.is_well_formed() {
            return invalid("categorical vocabulary is not sorted and unique".to_string());
        }
        self.thresholds.validate().map_err(ArtifactError::Invalid)?;
        Ok(())
    }

    /// Parse and validate an artifact from JSON.
    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let artifact: Self = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Load and validate an artifact file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model artifact");

        let content = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = Self::from_json(&content)?;

        info!(
            model_id = %artifact.model_id,
            trained_at = %artifact.trained_at,
            classes = ?artifact.classes.names(),
            "Model artifact loaded"
        );
        Ok(artifact)
    }

    /// Write the artifact, replacing any previous file at `path`.
    ///
    /// The JSON is written to a sibling temporary file first and renamed into
    /// place, so readers never observe a half-written artifact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let io_err = |source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_vec_pretty(self)?;
        let tmp_path = temporary_path(path);
        {
            let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
            file.write_all(&json).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        fs::rename(&tmp_path, path).map_err(io_err)?;

        info!(
            model_id = %self.model_id,
            path = %path.display(),
            bytes = json.len(),
            "Model artifact written"
        );
        Ok(())
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
