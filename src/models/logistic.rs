//! Binary logistic regression
//!
//! L2-regularised, unpenalised intercept, fitted by Newton–Raphson with step
//! halving. The objective is
//!
//! `Σ softplus(zᵢ) − yᵢ·zᵢ  +  ‖w‖² / (2C)`, with `zᵢ = w·xᵢ + b`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::math::{dot, sigmoid, softplus, solve_spd};
use crate::feature_extractor::FeatureVector;

/// Errors raised while scoring a feature vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("feature count mismatch: model expects {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("classifier produced a non-finite score: {0}")]
    NonFiniteScore(f64),
}

/// Errors raised while fitting
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("no training samples")]
    Empty,

    #[error("{features} feature rows but {targets} targets")]
    LengthMismatch { features: usize, targets: usize },

    #[error("target values must be 0 or 1, got {0}")]
    InvalidTarget(u8),

    #[error("regularization strength must be positive and finite, got {0}")]
    InvalidRegularization(f64),

    #[error("Hessian is not positive definite at iteration {0}")]
    Singular(usize),

    #[error("fit diverged to non-finite coefficients")]
    NonFinite,
}

/// Solver settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Inverse regularization strength
    pub c: f64,
    /// Maximum Newton iterations
    pub max_iter: usize,
    /// Convergence threshold on the largest coefficient update
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tolerance: 1e-6,
        }
    }
}

/// Summary of a completed fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    pub iterations: usize,
    pub converged: bool,
    /// Final value of the regularised objective
    pub loss: f64,
}

/// Fitted coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// One weight per feature, positional
    pub weights: Vec<f64>,
    pub intercept: f64,
}

const MAX_STEP_HALVINGS: usize = 30;
const INTERCEPT_RIDGE: f64 = 1e-10;

impl LogisticRegression {
    /// Fit on encoded feature vectors and 0/1 targets.
    pub fn fit(
        features: &[FeatureVector],
        targets: &[u8],
        options: &FitOptions,
    ) -> Result<(Self, FitReport), FitError> {
        if features.is_empty() {
            return Err(FitError::Empty);
        }
        if features.len() != targets.len() {
            return Err(FitError::LengthMismatch {
                features: features.len(),
                targets: targets.len(),
            });
        }
        if let Some(&bad) = targets.iter().find(|&&t| t > 1) {
            return Err(FitError::InvalidTarget(bad));
        }
        if !(options.c.is_finite() && options.c > 0.0) {
            return Err(FitError::InvalidRegularization(options.c));
        }

        let rows: Vec<&[f64]> = features.iter().map(FeatureVector::as_slice).collect();
        let y: Vec<f64> = targets.iter().map(|&t| f64::from(t)).collect();
        let n_features = rows[0].len();
        let dim = n_features + 1;
        let penalty = 1.0 / options.c;

        // theta = [w_0 .. w_{d-1}, b]
        let mut theta = vec![0.0; dim];
        let mut loss = objective(&rows, &y, &theta, penalty);
        let mut converged = false;
        let mut iterations = 0;

        for iter in 1..=options.max_iter {
            iterations = iter;
            let (gradient, hessian) = gradient_and_hessian(&rows, &y, &theta, penalty);

            let direction = solve_spd(&hessian, &gradient, dim).ok_or(FitError::Singular(iter))?;

            let mut step = 1.0;
            let mut candidate = theta.clone();
            let mut candidate_loss = loss;
            for _ in 0..MAX_STEP_HALVINGS {
                for (c, (t, d)) in candidate.iter_mut().zip(theta.iter().zip(&direction)) {
                    *c = t - step * d;
                }
                candidate_loss = objective(&rows, &y, &candidate, penalty);
                if candidate_loss <= loss {
                    break;
                }
                step *= 0.5;
            }

            if !candidate_loss.is_finite() || candidate.iter().any(|v| !v.is_finite()) {
                return Err(FitError::NonFinite);
            }

            let max_update = direction
                .iter()
                .map(|d| (step * d).abs())
                .fold(0.0, f64::max);

            if candidate_loss > loss {
                // No descent along the Newton direction: already at the optimum
                // to numerical precision.
                converged = true;
                break;
            }

            theta = candidate;
            loss = candidate_loss;

            debug!(iteration = iter, loss = loss, max_update = max_update, "Newton step");

            if max_update < options.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                max_iter = options.max_iter,
                loss = loss,
                "Logistic regression did not converge; increase max_iter"
            );
        }

        let intercept = theta[n_features];
        theta.truncate(n_features);

        Ok((
            Self {
                weights: theta,
                intercept,
            },
            FitReport {
                iterations,
                converged,
                loss,
            },
        ))
    }

    /// Number of features the model expects.
    pub fn feature_count(&self) -> usize {
        self.weights.len()
    }

    /// Signed distance to the decision boundary, `w·x + b`.
    pub fn decision_function(&self, features: &[f64]) -> Result<f64, PredictionError> {
        if features.len() != self.weights.len() {
            return Err(PredictionError::DimensionMismatch {
                expected: self.weights.len(),
                got: features.len(),
            });
        }
        let z = dot(&self.weights, features) + self.intercept;
        if !z.is_finite() {
            return Err(PredictionError::NonFiniteScore(z));
        }
        Ok(z)
    }

    /// Probability of class 1.
    pub fn predict_proba(&self, features: &[f64]) -> Result<f64, PredictionError> {
        self.decision_function(features).map(sigmoid)
    }

    /// Class code: 1 when the decision value is strictly positive.
    pub fn predict(&self, features: &[f64]) -> Result<u8, PredictionError> {
        self.decision_function(features).map(class_for)
    }

    /// Class code and probability of class 1 from a single decision value.
    ///
    /// The class comes from the sign of `z`, not from rounding the
    /// probability, so it always agrees with [`predict`](Self::predict).
    pub fn score(&self, features: &[f64]) -> Result<(u8, f64), PredictionError> {
        self.decision_function(features)
            .map(|z| (class_for(z), sigmoid(z)))
    }

    /// True when every coefficient is a finite number.
    pub fn is_finite(&self) -> bool {
        self.intercept.is_finite() && self.weights.iter().all(|w| w.is_finite())
    }
}

fn class_for(z: f64) -> u8 {
    u8::from(z > 0.0)
}

fn linear(row: &[f64], theta: &[f64]) -> f64 {
    let n = row.len();
    dot(&theta[..n], row) + theta[n]
}

fn objective(rows: &[&[f64]], y: &[f64], theta: &[f64], penalty: f64) -> f64 {
    let n = theta.len() - 1;
    let data_loss: f64 = rows
        .iter()
        .zip(y)
        .map(|(row, &yi)| {
            let z = linear(row, theta);
            softplus(z) - yi * z
        })
        .sum();
    let l2: f64 = theta[..n].iter().map(|w| w * w).sum();
    data_loss + 0.5 * penalty * l2
}

/// Gradient and row-major Hessian of the objective.
fn gradient_and_hessian(
    rows: &[&[f64]],
    y: &[f64],
    theta: &[f64],
    penalty: f64,
) -> (Vec<f64>, Vec<f64>) {
    let dim = theta.len();
    let n = dim - 1;
    let mut gradient = vec![0.0; dim];
    let mut hessian = vec![0.0; dim * dim];
    let mut x = vec![1.0; dim];

    for (row, &yi) in rows.iter().zip(y) {
        x[..n].copy_from_slice(row);
        let p = sigmoid(linear(row, theta));
        let residual = p - yi;
        let weight = p * (1.0 - p);

        for i in 0..dim {
            gradient[i] += residual * x[i];
            let wx = weight * x[i];
            for j in 0..=i {
                hessian[i * dim + j] += wx * x[j];
            }
        }
    }

    for i in 0..dim {
        for j in 0..i {
            hessian[j * dim + i] = hessian[i * dim + j];
        }
    }

    for i in 0..n {
        gradient[i] += penalty * theta[i];
        hessian[i * dim + i] += penalty;
    }
    hessian[n * dim + n] += INTERCEPT_RIDGE;

    (gradient, hessian)
}
