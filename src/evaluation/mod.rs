//! Cross-validated candidate evaluation, model selection, feature
//! ranking, and residual-based prediction intervals
//!
//! Every candidate sees the same seeded fold assignment, so metric
//! differences come from the algorithms alone. A candidate that fails to
//! fit is dropped from the result set; the analysis carries on with the
//! survivors.

use crate::error::{EffortError, Result};
use crate::training::{CandidateModel, KFold};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Evaluation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Number of cross-validation folds
    pub n_folds: usize,
    /// Seed for fold shuffling and the candidate models
    pub seed: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            seed: 42,
        }
    }
}

/// Aggregated cross-validation outcome for one candidate
#[derive(Debug, Clone)]
pub struct ModelEvaluation {
    pub candidate: CandidateModel,
    /// Mean RMSE across folds
    pub rmse: f64,
    /// Mean MAE across folds
    pub mae: f64,
    /// Mean per-feature importances (all zeros when unsupported)
    pub feature_importances: Array1<f64>,
    /// Pooled out-of-fold residuals (actual - predicted), in fold order
    pub residuals: Vec<f64>,
}

/// A ranked (feature, importance) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Accuracy summary reported per candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub rmse: f64,
    pub mae: f64,
}

impl From<&ModelEvaluation> for ModelScore {
    fn from(eval: &ModelEvaluation) -> Self {
        Self {
            rmse: eval.rmse,
            mae: eval.mae,
        }
    }
}

/// Empirical residual band around point predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInterval {
    pub lower_residual_quantile: f64,
    pub upper_residual_quantile: f64,
    pub interval_width: f64,
}

/// Run k-fold evaluation of every candidate over the feature matrix.
///
/// Returns evaluations in candidate order, omitting candidates that could
/// not be fitted (their failure is logged, not fatal).
pub fn evaluate_candidates(
    x: &Array2<f64>,
    y: &Array1<f64>,
    config: &EvaluationConfig,
) -> Result<Vec<ModelEvaluation>> {
    let n_samples = x.nrows();
    let n_features = x.ncols();
    let splits = KFold::new(config.n_folds, config.seed).split(n_samples)?;

    let mut evaluations = Vec::with_capacity(CandidateModel::ALL.len());

    'candidates: for candidate in CandidateModel::ALL {
        let mut rmses = Vec::with_capacity(splits.len());
        let mut maes = Vec::with_capacity(splits.len());
        let mut residuals: Vec<f64> = Vec::with_capacity(n_samples);
        let mut importances = Array1::zeros(n_features);

        for split in &splits {
            let x_train = x.select(Axis(0), &split.train_indices);
            let x_test = x.select(Axis(0), &split.test_indices);
            let y_train: Array1<f64> =
                Array1::from_vec(split.train_indices.iter().map(|&i| y[i]).collect());
            let y_test: Array1<f64> =
                Array1::from_vec(split.test_indices.iter().map(|&i| y[i]).collect());

            let outcome = candidate
                .fit(&x_train, &y_train, config.seed)
                .and_then(|fitted| Ok((fitted.predict(&x_test)?, fitted)));

            let (predictions, fitted) = match outcome {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(candidate = candidate.name(), fold = split.fold_idx, error = %e,
                        "candidate dropped: fold fit/predict failed");
                    continue 'candidates;
                }
            };

            rmses.push(rmse(&y_test, &predictions));
            maes.push(mae(&y_test, &predictions));
            residuals.extend(y_test.iter().zip(predictions.iter()).map(|(a, p)| a - p));

            if candidate.supports_importances() {
                importances = importances + fitted.feature_importances(n_features);
            }
        }

        importances /= splits.len() as f64;

        evaluations.push(ModelEvaluation {
            candidate,
            rmse: mean(&rmses),
            mae: mean(&maes),
            feature_importances: importances,
            residuals,
        });
    }

    Ok(evaluations)
}

/// Pick the candidate with the lowest mean RMSE. The scan keeps the first
/// strict minimum, so a tie resolves toward the earlier candidate in the
/// fixed order. Non-finite RMSE sorts last.
pub fn select_best(evaluations: &[ModelEvaluation]) -> Result<&ModelEvaluation> {
    let mut best: Option<&ModelEvaluation> = None;

    for eval in evaluations {
        let score = finite_or_inf(eval.rmse);
        match best {
            None => best = Some(eval),
            Some(current) if score < finite_or_inf(current.rmse) => best = Some(eval),
            _ => {}
        }
    }

    best.ok_or_else(|| {
        EffortError::Training("no candidate model could be fitted on this dataset".to_string())
    })
}

fn finite_or_inf(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        f64::INFINITY
    }
}

/// Rank features by importance, descending, keeping at most `limit`.
/// An all-zero vector still produces a ranking; callers must not read
/// relevance into it.
pub fn top_features(
    names: &[String],
    importances: &Array1<f64>,
    limit: usize,
) -> Vec<FeatureImportance> {
    let mut pairs: Vec<FeatureImportance> = names
        .iter()
        .zip(importances.iter())
        .map(|(name, &importance)| FeatureImportance {
            feature: name.clone(),
            importance,
        })
        .collect();

    // Stable sort: equal importances keep column order
    pairs.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    pairs.truncate(limit);
    pairs
}

/// Derive the 2.5th/97.5th percentile band from pooled out-of-fold
/// residuals. An empty pool yields no interval.
pub fn residual_interval(residuals: &[f64]) -> Option<PredictionInterval> {
    if residuals.is_empty() {
        return None;
    }

    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let lower = quantile(&sorted, 0.025);
    let upper = quantile(&sorted, 0.975);

    Some(PredictionInterval {
        lower_residual_quantile: lower,
        upper_residual_quantile: upper,
        interval_width: upper - lower,
    })
}

/// Linear-interpolated quantile over pre-sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    let mse: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / n;
    mse.sqrt()
}

fn mae(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
