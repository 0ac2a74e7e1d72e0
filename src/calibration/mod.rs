//! Per-domain model recalibration
//!
//! When a grouping column is supplied, each sufficiently large
//! sub-population gets its own preprocessing pass and a lighter
//! cross-validated model comparison, independent of the global selection.
//! Undersized groups are skipped silently; a failure in one group never
//! touches the others.

use crate::error::{EffortError, Result};
use crate::evaluation::{evaluate_candidates, select_best, EvaluationConfig, ModelScore};
use crate::preprocessing::preprocess;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Recalibration outcome for one domain value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainGroupResult {
    pub best_model: String,
    pub best_rmse: f64,
    pub best_mae: f64,
    pub all_models: BTreeMap<String, ModelScore>,
    /// Number of rows in this group
    pub count: usize,
}

/// Read the grouping column as one label per row (missing stays `None`).
/// Non-string labels are rendered as text so that numeric grouping
/// columns work too.
pub fn domain_labels(df: &DataFrame, domain_column: &str) -> Result<Vec<Option<String>>> {
    let cast = df
        .column(domain_column)
        .map_err(|_| EffortError::Schema(format!("domain column {:?} not found", domain_column)))?
        .as_materialized_series()
        .cast(&DataType::String)
        .map_err(|e| EffortError::Data(e.to_string()))?;

    let ca = cast.str().map_err(|e| EffortError::Data(e.to_string()))?;
    Ok(ca
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Re-run preprocessing and a lighter cross-validation per distinct
/// non-missing domain value with at least `min_rows` rows.
///
/// Fold count is `min(max_folds, group rows)` by explicit policy.
/// Returns a mapping from domain value to its group result; values whose
/// processing fails are skipped with a warning.
pub fn calibrate_domains(
    df: &DataFrame,
    target_column: &str,
    domain_column: &str,
    min_rows: usize,
    max_folds: usize,
    seed: u64,
) -> BTreeMap<String, DomainGroupResult> {
    let labels = match domain_labels(df, domain_column) {
        Ok(labels) => labels,
        Err(e) => {
            warn!(error = %e, "domain calibration skipped: grouping column unreadable");
            return BTreeMap::new();
        }
    };

    // BTreeMap iteration gives deterministic, sorted domain order
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (row, label) in labels.iter().enumerate() {
        if let Some(value) = label {
            groups.entry(value.clone()).or_default().push(row);
        }
    }

    let mut results = BTreeMap::new();

    for (value, rows) in groups {
        if rows.len() < min_rows {
            debug!(domain = %value, rows = rows.len(), "domain group below minimum size, skipped");
            continue;
        }

        match calibrate_group(df, target_column, domain_column, &rows, max_folds, seed) {
            Ok(result) => {
                results.insert(value, result);
            }
            Err(e) => {
                warn!(domain = %value, error = %e, "domain group skipped");
            }
        }
    }

    results
}

fn calibrate_group(
    df: &DataFrame,
    target_column: &str,
    domain_column: &str,
    rows: &[usize],
    max_folds: usize,
    seed: u64,
) -> Result<DomainGroupResult> {
    let indices: Vec<u32> = rows.iter().map(|&i| i as u32).collect();
    let subset = df.take(&IdxCa::from_vec("rows".into(), indices))?;

    let mut pre = preprocess(&subset, target_column)?;
    // The grouping column is constant within the group and must not leak
    // into its feature matrix
    pre.drop_feature(domain_column);

    if pre.features.ncols() == 0 {
        return Err(EffortError::Feature(
            "no features remain for this domain group".to_string(),
        ));
    }

    let config = EvaluationConfig {
        n_folds: max_folds.min(pre.features.nrows()),
        seed,
    };
    let evaluations = evaluate_candidates(&pre.features, &pre.target, &config)?;
    let best = select_best(&evaluations)?;

    Ok(DomainGroupResult {
        best_model: best.candidate.name().to_string(),
        best_rmse: best.rmse,
        best_mae: best.mae,
        all_models: evaluations
            .iter()
            .map(|e| (e.candidate.name().to_string(), ModelScore::from(e)))
            .collect(),
        count: rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regional_df() -> DataFrame {
        // 8 rows North, 3 rows South
        let regions: Vec<&str> = std::iter::repeat("North")
            .take(8)
            .chain(std::iter::repeat("South").take(3))
            .collect();
        let sizes: Vec<f64> = (1..=11).map(|i| i as f64).collect();
        let efforts: Vec<f64> = sizes.iter().map(|s| 3.0 * s).collect();

        df!(
            "Effort" => efforts,
            "Size" => sizes,
            "Region" => regions
        )
        .unwrap()
    }

    #[test]
    fn test_small_groups_skipped() {
        let df = regional_df();
        let results = calibrate_domains(&df, "Effort", "Region", 5, 3, 42);

        assert!(results.contains_key("North"));
        assert!(!results.contains_key("South"));

        let north = &results["North"];
        assert_eq!(north.count, 8);
        assert!(north.best_rmse >= 0.0);
        assert!(north.best_mae >= 0.0);
        assert!(!north.all_models.is_empty());
        assert!(north.all_models.contains_key(north.best_model.as_str()));
    }

    #[test]
    fn test_domain_column_dropped_from_features() {
        // Region plus a single Size feature: the per-group matrix must not
        // retain the constant Region column, and calibration still works
        let df = regional_df();
        let results = calibrate_domains(&df, "Effort", "Region", 5, 3, 42);
        let north = &results["North"];
        // Linear relation within the group is recoverable without Region
        assert!(north.all_models.contains_key("LinearRegression"));
    }

    #[test]
    fn test_missing_domain_values_ignored() {
        let df = df!(
            "Effort" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "Size" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "Region" => &[None::<&str>, None, None, None, None, None]
        )
        .unwrap();

        let results = calibrate_domains(&df, "Effort", "Region", 5, 3, 42);
        assert!(results.is_empty());
    }

    #[test]
    fn test_domain_labels_stringify_numbers() {
        let df = df!(
            "Effort" => &[1.0, 2.0],
            "Code" => &[10i64, 20]
        )
        .unwrap();

        let labels = domain_labels(&df, "Code").unwrap();
        assert_eq!(labels, vec![Some("10".to_string()), Some("20".to_string())]);
    }
}
