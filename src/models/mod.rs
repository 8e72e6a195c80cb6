//! Classifier components: coefficients, vocabularies, persistence, inference

pub mod artifact;
pub mod inference;
pub mod logistic;
mod math;
pub mod vocabulary;

pub use artifact::{ArtifactError, ModelArtifact};
pub use inference::InferenceEngine;
pub use logistic::{FitOptions, LogisticRegression, PredictionError};
pub use vocabulary::{CategoricalVocabularies, CategoryVocabulary, ClassLabels};
