//! Unsupervised outlier scoring over the full dataset
//!
//! Independent of the cross-validation loop: the detector sees every row
//! once, and a failure here degrades to an empty outlier list instead of
//! aborting the analysis.

mod isolation_forest;

pub use isolation_forest::{IsolationForest, IsolationTree};

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Trait for anomaly detectors
pub trait AnomalyDetector: Send + Sync {
    /// Fit the detector on training data
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Compute anomaly scores (higher = more anomalous)
    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// One flagged row of the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierRecord {
    /// Index of the row in the original table
    pub row_index: usize,
    /// Anomaly score (higher = more anomalous)
    pub score: f64,
    /// The row's target value
    pub effort: f64,
    /// The row's domain label, when a grouping column was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Score every row with an isolation forest and return the `limit`
/// highest-scoring rows, ordered by non-increasing score.
///
/// Any failure yields an empty list; the main analysis never aborts here.
pub fn detect_outliers(
    x: &Array2<f64>,
    y: &Array1<f64>,
    domains: Option<&[Option<String>]>,
    limit: usize,
    seed: u64,
) -> Vec<OutlierRecord> {
    match try_detect_outliers(x, y, domains, limit, seed) {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "outlier detection failed, continuing without outliers");
            Vec::new()
        }
    }
}

fn try_detect_outliers(
    x: &Array2<f64>,
    y: &Array1<f64>,
    domains: Option<&[Option<String>]>,
    limit: usize,
    seed: u64,
) -> Result<Vec<OutlierRecord>> {
    let mut forest = IsolationForest::new().with_seed(seed);
    forest.fit(x)?;
    let scores = forest.score_samples(x)?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    // Highest score first; ties resolve toward the earlier row
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    order.truncate(limit);

    Ok(order
        .into_iter()
        .map(|row_index| OutlierRecord {
            row_index,
            score: scores[row_index],
            effort: y[row_index],
            domain: domains.and_then(|d| d.get(row_index).cloned().flatten()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_with_outlier() -> (Array2<f64>, Array1<f64>) {
        let mut data = Vec::new();
        let mut targets = Vec::new();
        for i in 0..40 {
            data.push((i % 8) as f64);
            targets.push(10.0 + (i % 8) as f64);
        }
        data.push(10_000.0);
        targets.push(99_999.0);

        (
            Array2::from_shape_vec((41, 1), data).unwrap(),
            Array1::from_vec(targets),
        )
    }

    #[test]
    fn test_top_outlier_is_extreme_row() {
        let (x, y) = clustered_with_outlier();
        let outliers = detect_outliers(&x, &y, None, 5, 42);

        assert!(!outliers.is_empty());
        assert!(outliers.len() <= 5);
        assert_eq!(outliers[0].row_index, 40);
        assert_eq!(outliers[0].effort, 99_999.0);
        for pair in outliers.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_domain_labels_carried() {
        let (x, y) = clustered_with_outlier();
        let domains: Vec<Option<String>> = (0..41)
            .map(|i| {
                if i == 40 {
                    Some("West".to_string())
                } else {
                    Some("East".to_string())
                }
            })
            .collect();

        let outliers = detect_outliers(&x, &y, Some(&domains), 5, 42);
        assert_eq!(outliers[0].domain.as_deref(), Some("West"));
    }

    #[test]
    fn test_failure_degrades_to_empty() {
        let x = Array2::<f64>::zeros((0, 0));
        let y = Array1::<f64>::zeros(0);
        let outliers = detect_outliers(&x, &y, None, 5, 42);
        assert!(outliers.is_empty());
    }
}
