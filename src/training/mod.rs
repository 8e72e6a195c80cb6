//! Offline training pipeline
//!
//! A linear stage machine: LOAD → CLEAN → ENCODE → BALANCE_CHECK → SPLIT →
//! FIT → EVALUATE → PERSIST. Any fatal error stops the run; the artifact is
//! written only by the final stage, so a failed run leaves the previous
//! artifact untouched.

pub mod balance;
pub mod dataset;
pub mod evaluation;
pub mod split;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;
use crate::feature_extractor::{FeatureExtractor, FeatureVector, Thresholds};
use crate::models::artifact::{ArtifactError, ModelArtifact};
use crate::models::logistic::{FitError, FitOptions, FitReport, LogisticRegression, PredictionError};
use crate::models::vocabulary::ClassLabels;
use crate::types::telemetry::Telemetry;

use dataset::RawRows;
use evaluation::EvaluationReport;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrainingStage {
    Load,
    Clean,
    Encode,
    BalanceCheck,
    Split,
    Fit,
    Evaluate,
    Persist,
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrainingStage::Load => "LOAD",
            TrainingStage::Clean => "CLEAN",
            TrainingStage::Encode => "ENCODE",
            TrainingStage::BalanceCheck => "BALANCE_CHECK",
            TrainingStage::Split => "SPLIT",
            TrainingStage::Fit => "FIT",
            TrainingStage::Evaluate => "EVALUATE",
            TrainingStage::Persist => "PERSIST",
        };
        f.write_str(name)
    }
}

/// Fatal training errors
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("dataset load failed: {0}")]
    DatasetLoad(String),

    #[error("dataset load failed: no usable rows ({dropped} dropped during cleaning)")]
    NoUsableRows { dropped: usize },

    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("at least 2 label classes are required, found {found}")]
    InsufficientClasses { stage: TrainingStage, found: usize },

    #[error("binary classifier needs exactly 2 label classes, found {found}: {labels:?}")]
    TooManyClasses { found: usize, labels: Vec<String> },

    #[error("model fit failed: {0}")]
    Fit(#[from] FitError),

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] PredictionError),

    #[error("persisting artifact failed: {0}")]
    Persist(#[from] ArtifactError),
}

impl TrainingError {
    /// Stage that raised the error.
    pub fn stage(&self) -> TrainingStage {
        match self {
            TrainingError::DatasetLoad(_) => TrainingStage::Load,
            TrainingError::NoUsableRows { .. } => TrainingStage::Clean,
            TrainingError::InvalidThresholds(_) => TrainingStage::Encode,
            TrainingError::InsufficientClasses { stage, .. } => *stage,
            TrainingError::TooManyClasses { .. } => TrainingStage::Encode,
            TrainingError::Fit(_) => TrainingStage::Fit,
            TrainingError::Evaluation(_) => TrainingStage::Evaluate,
            TrainingError::Persist(_) => TrainingStage::Persist,
        }
    }
}

/// Knobs for one training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    /// Fraction of rows held out for evaluation
    pub test_ratio: f64,
    /// Seed for resampling and the train/test shuffle
    pub seed: u64,
    pub fit: FitOptions,
    pub thresholds: Thresholds,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 100,
            fit: FitOptions::default(),
            thresholds: Thresholds::default(),
        }
    }
}

impl TrainingOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            test_ratio: config.training.test_ratio,
            seed: config.training.seed,
            fit: FitOptions {
                c: config.training.regularization,
                max_iter: config.training.max_iter,
                tolerance: config.training.tolerance,
            },
            thresholds: config.thresholds,
        }
    }
}

/// What happened during a run, for logging and tests
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub rows_loaded: usize,
    pub rows_dropped: usize,
    /// Per-class counts before balancing, indexed by class code
    pub class_counts_before: [usize; 2],
    /// Per-class counts after balancing
    pub class_counts_after: [usize; 2],
    pub resampled: bool,
    pub train_rows: usize,
    pub test_rows: usize,
    pub fit: FitReport,
    pub evaluation: EvaluationReport,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub report: TrainingReport,
}

/// Drives the stage machine
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    options: TrainingOptions,
}

impl Trainer {
    pub fn new(options: TrainingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TrainingOptions {
        &self.options
    }

    /// Run every stage: load the CSV at `dataset_path`, train, and write the
    /// artifact to `artifact_path`.
    pub fn run<P, Q>(&self, dataset_path: P, artifact_path: Q) -> Result<TrainingOutcome, TrainingError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        info!(stage = %TrainingStage::Load, path = %dataset_path.as_ref().display(), "Loading dataset");
        let rows = dataset::load_dataset(dataset_path)?;

        let outcome = self.train(rows)?;

        info!(stage = %TrainingStage::Persist, path = %artifact_path.as_ref().display(), "Persisting artifact");
        outcome.artifact.save(artifact_path)?;

        Ok(outcome)
    }

    /// Run CLEAN through EVALUATE on already-loaded rows. Nothing is written.
    pub fn train(&self, rows: RawRows) -> Result<TrainingOutcome, TrainingError> {
        let rows_loaded = rows.len();
        let mut rng = StdRng::seed_from_u64(self.options.seed);

        // CLEAN
        let cleaned = dataset::clean(rows);
        let rows_dropped = cleaned.dropped.len();
        info!(
            stage = %TrainingStage::Clean,
            kept = cleaned.records.len(),
            dropped = rows_dropped,
            "Dataset cleaned"
        );
        if cleaned.records.is_empty() {
            return Err(TrainingError::NoUsableRows {
                dropped: rows_dropped,
            });
        }

        // ENCODE
        self.options
            .thresholds
            .validate()
            .map_err(TrainingError::InvalidThresholds)?;

        let classes = ClassLabels::fit(cleaned.records.iter().map(|r| r.label.as_str()));
        match classes.len() {
            2 => {}
            n if n < 2 => {
                return Err(TrainingError::InsufficientClasses {
                    stage: TrainingStage::Encode,
                    found: n,
                })
            }
            n => {
                return Err(TrainingError::TooManyClasses {
                    found: n,
                    labels: classes.names().to_vec(),
                })
            }
        }

        let telemetry: Vec<Telemetry> = cleaned.records.iter().map(|r| r.telemetry.clone()).collect();
        let extractor = FeatureExtractor::fit(self.options.thresholds, &telemetry);
        let (features, targets): (Vec<FeatureVector>, Vec<u8>) = cleaned
            .records
            .iter()
            .filter_map(|r| {
                classes
                    .code(&r.label)
                    .map(|code| (extractor.extract(&r.telemetry), code))
            })
            .unzip();
        info!(
            stage = %TrainingStage::Encode,
            rows = features.len(),
            features = extractor.feature_count(),
            classes = ?classes.names(),
            "Features encoded"
        );

        // BALANCE_CHECK
        let class_counts_before = balance::class_counts(&targets);
        log_distribution("Class distribution before balancing", &classes, &class_counts_before);

        let balanced = balance::balance(features, targets, &mut rng);
        let class_counts_after = balance::class_counts(&balanced.targets);
        if balanced.resampled {
            log_distribution("Class distribution after resampling", &classes, &class_counts_after);
        }

        // SPLIT
        let partition = split::train_test_split(
            balanced.samples,
            balanced.targets,
            self.options.test_ratio,
            &mut rng,
        );
        info!(
            stage = %TrainingStage::Split,
            train = partition.train.len(),
            test = partition.test.len(),
            seed = self.options.seed,
            "Dataset split"
        );

        let train_classes = balance::class_counts(&partition.train_targets)
            .iter()
            .filter(|&&count| count > 0)
            .count();
        if train_classes < 2 {
            return Err(TrainingError::InsufficientClasses {
                stage: TrainingStage::Split,
                found: train_classes,
            });
        }

        // FIT
        let (classifier, fit) = LogisticRegression::fit(
            &partition.train,
            &partition.train_targets,
            &self.options.fit,
        )?;
        info!(
            stage = %TrainingStage::Fit,
            iterations = fit.iterations,
            converged = fit.converged,
            loss = fit.loss,
            "Classifier fitted"
        );

        // EVALUATE
        let evaluation =
            evaluation::evaluate(&classifier, &partition.test, &partition.test_targets)?;
        info!(stage = %TrainingStage::Evaluate, "Evaluation: {}", evaluation);

        let artifact = ModelArtifact::new(
            self.options.thresholds,
            extractor.vocabulary().clone(),
            classes,
            classifier,
        )
        .with_evaluation(evaluation.clone(), partition.train.len());

        Ok(TrainingOutcome {
            artifact,
            report: TrainingReport {
                rows_loaded,
                rows_dropped,
                class_counts_before,
                class_counts_after,
                resampled: balanced.resampled,
                train_rows: partition.train.len(),
                test_rows: partition.test.len(),
                fit,
                evaluation,
            },
        })
    }
}

fn log_distribution(message: &str, classes: &ClassLabels, counts: &[usize; 2]) {
    for (code, count) in counts.iter().enumerate() {
        let label = classes.name(code as u8).unwrap_or("?");
        info!(stage = %TrainingStage::BalanceCheck, class = %label, count = count, "{}", message);
    }
}
