//! The fixed candidate model set
//!
//! Every analysis evaluates the same five regressors. The declaration
//! order below is significant: model selection scans it in order and keeps
//! the first strict minimum, so ties resolve toward the earlier candidate.

use super::extra_trees::ExtraTrees;
use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use super::linear_models::LinearRegression;
use super::random_forest::RandomForest;
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A named candidate regression algorithm with a fixed configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateModel {
    RandomForest200,
    RandomForest500,
    ExtraTrees200,
    GradientBoosting,
    LinearRegression,
}

impl CandidateModel {
    /// All candidates, in tie-break order
    pub const ALL: [CandidateModel; 5] = [
        CandidateModel::RandomForest200,
        CandidateModel::RandomForest500,
        CandidateModel::ExtraTrees200,
        CandidateModel::GradientBoosting,
        CandidateModel::LinearRegression,
    ];

    /// Stable display name, used as the key in reports
    pub fn name(self) -> &'static str {
        match self {
            CandidateModel::RandomForest200 => "RandomForest_200",
            CandidateModel::RandomForest500 => "RandomForest_500",
            CandidateModel::ExtraTrees200 => "ExtraTrees_200",
            CandidateModel::GradientBoosting => "GradientBoosting",
            CandidateModel::LinearRegression => "LinearRegression",
        }
    }

    /// Whether the algorithm exposes per-feature importances
    pub fn supports_importances(self) -> bool {
        !matches!(self, CandidateModel::LinearRegression)
    }

    /// Fit this candidate on the given training data
    pub fn fit(self, x: &Array2<f64>, y: &Array1<f64>, seed: u64) -> Result<FittedCandidate> {
        match self {
            CandidateModel::RandomForest200 => {
                let mut model = RandomForest::new(200).with_random_state(seed);
                model.fit(x, y)?;
                Ok(FittedCandidate::Forest(model))
            }
            CandidateModel::RandomForest500 => {
                let mut model = RandomForest::new(500).with_random_state(seed);
                model.fit(x, y)?;
                Ok(FittedCandidate::Forest(model))
            }
            CandidateModel::ExtraTrees200 => {
                let mut model = ExtraTrees::new(200).with_random_state(seed);
                model.fit(x, y)?;
                Ok(FittedCandidate::Extra(model))
            }
            CandidateModel::GradientBoosting => {
                let config = GradientBoostingConfig {
                    random_state: Some(seed),
                    ..GradientBoostingConfig::default()
                };
                let mut model = GradientBoostingRegressor::new(config);
                model.fit(x, y)?;
                Ok(FittedCandidate::Boosted(model))
            }
            CandidateModel::LinearRegression => {
                let mut model = LinearRegression::new();
                model.fit(x, y)?;
                Ok(FittedCandidate::Linear(model))
            }
        }
    }
}

impl std::fmt::Display for CandidateModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A fitted candidate, dispatching prediction and the importance
/// capability uniformly across algorithm families
pub enum FittedCandidate {
    Forest(RandomForest),
    Extra(ExtraTrees),
    Boosted(GradientBoostingRegressor),
    Linear(LinearRegression),
}

impl FittedCandidate {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            FittedCandidate::Forest(m) => m.predict(x),
            FittedCandidate::Extra(m) => m.predict(x),
            FittedCandidate::Boosted(m) => m.predict(x),
            FittedCandidate::Linear(m) => m.predict(x),
        }
    }

    /// Per-feature importances, or an all-zero vector when the algorithm
    /// has none. Downstream ranking stays uniform either way.
    pub fn feature_importances(&self, n_features: usize) -> Array1<f64> {
        match self {
            FittedCandidate::Forest(m) => m
                .feature_importances()
                .cloned()
                .unwrap_or_else(|| Array1::zeros(n_features)),
            FittedCandidate::Extra(m) => m
                .feature_importances()
                .unwrap_or_else(|| Array1::zeros(n_features)),
            FittedCandidate::Boosted(m) => {
                let imp = m.feature_importances();
                if imp.len() == n_features {
                    Array1::from_vec(imp.to_vec())
                } else {
                    Array1::zeros(n_features)
                }
            }
            FittedCandidate::Linear(_) => Array1::zeros(n_features),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_candidate_order_and_names() {
        let names: Vec<&str> = CandidateModel::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "RandomForest_200",
                "RandomForest_500",
                "ExtraTrees_200",
                "GradientBoosting",
                "LinearRegression"
            ]
        );
    }

    #[test]
    fn test_linear_has_zero_importances() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];

        let fitted = CandidateModel::LinearRegression.fit(&x, &y, 42).unwrap();
        let imp = fitted.feature_importances(1);
        assert_eq!(imp.len(), 1);
        assert_eq!(imp[0], 0.0);
        assert!(!CandidateModel::LinearRegression.supports_importances());
    }

    #[test]
    fn test_every_candidate_fits_small_data() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![3.0, 6.0, 9.0, 12.0, 15.0, 18.0];

        for candidate in CandidateModel::ALL {
            let fitted = candidate.fit(&x, &y, 42).unwrap();
            let preds = fitted.predict(&x).unwrap();
            assert_eq!(preds.len(), 6, "{} prediction length", candidate);
        }
    }
}
