//! The analysis entry point
//!
//! One synchronous call per request: load the table, resolve the effort
//! column, preprocess, compare candidates under cross-validation, then run
//! the independent outlier and per-domain branches. All inputs arrive as
//! explicit parameters; nothing is read from process-wide state, so
//! concurrent analyses cannot interfere.

use crate::anomaly::{detect_outliers, OutlierRecord};
use crate::calibration::{calibrate_domains, domain_labels, DomainGroupResult};
use crate::dataset::{find_target_column, load_dataset};
use crate::error::{EffortError, Result};
use crate::evaluation::{
    evaluate_candidates, residual_interval, select_best, top_features, EvaluationConfig,
    FeatureImportance, ModelScore, PredictionInterval,
};
use crate::preprocessing::preprocess;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Inputs for one analysis call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Path to the dataset file (CSV or ARFF). Required.
    pub dataset_path: Option<String>,
    /// Optional grouping column for per-domain recalibration
    pub domain_column: Option<String>,
}

impl AnalysisRequest {
    pub fn new(dataset_path: impl Into<String>) -> Self {
        Self {
            dataset_path: Some(dataset_path.into()),
            domain_column: None,
        }
    }

    pub fn with_domain_column(mut self, column: impl Into<String>) -> Self {
        self.domain_column = Some(column.into());
        self
    }
}

/// Fixed analysis policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Cross-validation folds for the global comparison
    pub n_folds: usize,
    /// Seed for fold shuffling and every seeded model
    pub seed: u64,
    /// Maximum entries in the feature ranking
    pub top_features: usize,
    /// Maximum outlier rows reported
    pub top_outliers: usize,
    /// Minimum rows for a domain group to be calibrated
    pub min_domain_rows: usize,
    /// Fold cap for per-domain cross-validation
    pub max_domain_folds: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            n_folds: 5,
            seed: 42,
            top_features: 5,
            top_outliers: 5,
            min_domain_rows: 5,
            max_domain_folds: 3,
        }
    }
}

/// The structured result of one analysis call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub dataset_path: String,
    pub target_column: String,
    pub best_model: String,
    pub best_model_rmse: f64,
    pub best_model_mae: f64,
    /// Feature ranking for the selected model, non-increasing importance
    pub top_features: Vec<FeatureImportance>,
    /// Metrics for every candidate that fit successfully
    pub all_models: BTreeMap<String, ModelScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_interval: Option<PredictionInterval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outliers: Option<Vec<OutlierRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_specific_models: Option<BTreeMap<String, DomainGroupResult>>,
}

/// Run a full analysis with default options.
pub fn analyze(request: &AnalysisRequest) -> Result<AnalysisReport> {
    analyze_with_options(request, &AnalysisOptions::default())
}

/// Run a full analysis.
///
/// Loading, target resolution, and preprocessing failures are fatal and
/// short-circuit before any model work. Candidate fit failures, the
/// outlier step, and individual domain groups degrade to partial results.
pub fn analyze_with_options(
    request: &AnalysisRequest,
    options: &AnalysisOptions,
) -> Result<AnalysisReport> {
    let path = request.dataset_path.as_deref().ok_or_else(|| {
        EffortError::Config("no dataset location supplied; cannot load dataset".to_string())
    })?;

    let df = load_dataset(path)?;

    let target_column = find_target_column(&df).ok_or_else(|| {
        EffortError::Schema(
            "no effort column found in dataset; expected a column containing 'effort'".to_string(),
        )
    })?;

    // A requested grouping column that is absent from the table is ignored,
    // not an error
    let domain_column = request
        .domain_column
        .as_deref()
        .filter(|c| df.column(c).is_ok());

    let pre = preprocess(&df, &target_column)?;
    debug!(
        rows = pre.features.nrows(),
        features = pre.features.ncols(),
        target = %target_column,
        "dataset preprocessed"
    );

    let config = EvaluationConfig {
        n_folds: options.n_folds,
        seed: options.seed,
    };
    let evaluations = evaluate_candidates(&pre.features, &pre.target, &config)?;
    let best = select_best(&evaluations)?;

    let ranked = top_features(
        &pre.feature_names,
        &best.feature_importances,
        options.top_features,
    );
    let interval = residual_interval(&best.residuals);

    let labels = domain_column.and_then(|col| domain_labels(&df, col).ok());
    let outliers = detect_outliers(
        &pre.features,
        &pre.target,
        labels.as_deref(),
        options.top_outliers,
        options.seed,
    );

    let domain_results = domain_column
        .map(|col| {
            calibrate_domains(
                &df,
                &target_column,
                col,
                options.min_domain_rows,
                options.max_domain_folds,
                options.seed,
            )
        })
        .filter(|results| !results.is_empty());

    Ok(AnalysisReport {
        dataset_path: path.to_string(),
        target_column,
        best_model: best.candidate.name().to_string(),
        best_model_rmse: best.rmse,
        best_model_mae: best.mae,
        top_features: ranked,
        all_models: evaluations
            .iter()
            .map(|e| (e.candidate.name().to_string(), ModelScore::from(e)))
            .collect(),
        prediction_interval: interval,
        outliers: if outliers.is_empty() {
            None
        } else {
            Some(outliers)
        },
        domain_specific_models: domain_results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path_is_config_error() {
        let err = analyze(&AnalysisRequest::default()).unwrap_err();
        assert!(matches!(err, EffortError::Config(_)));
    }

    #[test]
    fn test_request_builder() {
        let request = AnalysisRequest::new("data.csv").with_domain_column("Region");
        assert_eq!(request.dataset_path.as_deref(), Some("data.csv"));
        assert_eq!(request.domain_column.as_deref(), Some("Region"));
    }

    #[test]
    fn test_default_options_policy() {
        let options = AnalysisOptions::default();
        assert_eq!(options.n_folds, 5);
        assert_eq!(options.seed, 42);
        assert_eq!(options.top_features, 5);
        assert_eq!(options.top_outliers, 5);
        assert_eq!(options.min_domain_rows, 5);
        assert_eq!(options.max_domain_folds, 3);
    }
}
