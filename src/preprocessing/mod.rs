//! Feature preprocessing: target extraction, categorical encoding,
//! missing-value imputation
//!
//! Encoders live and die within a single analysis call. Codes are assigned
//! in first-seen order, so two invocations over the same rows always agree,
//! but no mapping survives the call.

use crate::error::{EffortError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::HashMap;

/// Fully numeric model inputs produced from a raw table.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Row-major feature matrix, one column per surviving feature
    pub features: Array2<f64>,
    /// Target vector, same row order as `features`
    pub target: Array1<f64>,
    /// Feature column names, in matrix column order
    pub feature_names: Vec<String>,
}

impl Preprocessed {
    /// Remove a feature column by name, if present. Used when a grouping
    /// column must not leak into a per-group model.
    pub fn drop_feature(&mut self, name: &str) {
        if let Some(idx) = self.feature_names.iter().position(|n| n == name) {
            self.feature_names.remove(idx);
            let keep: Vec<usize> = (0..self.features.ncols()).filter(|&j| j != idx).collect();
            self.features = self.features.select(ndarray::Axis(1), &keep);
        }
    }
}

/// Split a table into a numeric feature matrix and target vector.
///
/// The target column is coerced to `f64` (failure on any row is a hard
/// error). Non-numeric feature columns are label-encoded with a fresh
/// per-column mapping in first-seen order; missing entries in a
/// categorical column form one category of their own. Numeric feature
/// columns have missing values imputed with the column mean over the
/// non-missing values. The returned matrix contains no missing values; if
/// no feature column remains the call fails with [`EffortError::Feature`].
pub fn preprocess(df: &DataFrame, target_column: &str) -> Result<Preprocessed> {
    let target_series = df
        .column(target_column)
        .map_err(|_| EffortError::Schema(format!("target column {:?} not found", target_column)))?
        .as_materialized_series()
        .clone();
    let target = coerce_target(&target_series, target_column)?;

    let feature_columns: Vec<&Column> = df
        .get_columns()
        .iter()
        .filter(|c| c.name().as_str() != target_column)
        .collect();

    if feature_columns.is_empty() {
        return Err(EffortError::Feature(
            "no usable feature columns remain after preprocessing".to_string(),
        ));
    }

    let n_rows = df.height();
    let n_cols = feature_columns.len();
    let mut feature_names = Vec::with_capacity(n_cols);
    let mut data = Vec::with_capacity(n_rows * n_cols);

    for column in feature_columns {
        let series = column.as_materialized_series();
        let values = if is_numeric_dtype(series.dtype()) {
            impute_numeric(series)?
        } else {
            encode_categorical(series)?
        };
        debug_assert_eq!(values.len(), n_rows);
        data.extend(values);
        feature_names.push(column.name().to_string());
    }

    // Columns were appended contiguously; build (cols, rows) and transpose
    let features = Array2::from_shape_vec((n_cols, n_rows), data)?.t().to_owned();

    Ok(Preprocessed {
        features,
        target,
        feature_names,
    })
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Boolean
    )
}

fn coerce_target(series: &Series, name: &str) -> Result<Array1<f64>> {
    let cast = series
        .cast(&DataType::Float64)
        .map_err(|e| EffortError::Data(format!("target column {:?}: {}", name, e)))?;

    // A non-strict cast turns unparseable values into nulls; any null not
    // present in the source means some row could not be coerced.
    if cast.null_count() > series.null_count() {
        return Err(EffortError::Data(format!(
            "target column {:?} contains values that cannot be coerced to float",
            name
        )));
    }

    let values: Vec<f64> = cast
        .f64()
        .map_err(|e| EffortError::Data(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    Ok(Array1::from_vec(values))
}

fn impute_numeric(series: &Series) -> Result<Vec<f64>> {
    let ca = series
        .cast(&DataType::Float64)
        .map_err(|e| EffortError::Data(e.to_string()))?
        .f64()
        .map_err(|e| EffortError::Data(e.to_string()))?
        .clone();

    // Mean over non-missing values only; an all-missing column carries no
    // signal and imputes to 0.0
    let mean = ca.mean().unwrap_or(0.0);

    Ok(ca.into_iter().map(|v| v.unwrap_or(mean)).collect())
}

fn encode_categorical(series: &Series) -> Result<Vec<f64>> {
    // Non-string columns (dates, mixed payloads) are coerced to text first
    let as_text;
    let ca = match series.str() {
        Ok(ca) => ca,
        Err(_) => {
            as_text = series
                .cast(&DataType::String)
                .map_err(|e| EffortError::Data(e.to_string()))?;
            as_text.str().map_err(|e| EffortError::Data(e.to_string()))?
        }
    };

    let mut mapping: HashMap<Option<&str>, usize> = HashMap::new();
    let mut codes = Vec::with_capacity(ca.len());

    for value in ca {
        let next = mapping.len();
        let code = *mapping.entry(value).or_insert(next);
        codes.push(code as f64);
    }

    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_split() {
        let df = df!(
            "Effort" => &[10.0, 20.0, 30.0],
            "Size" => &[1.0, 2.0, 3.0]
        )
        .unwrap();

        let pre = preprocess(&df, "Effort").unwrap();
        assert_eq!(pre.features.nrows(), 3);
        assert_eq!(pre.features.ncols(), 1);
        assert_eq!(pre.feature_names, vec!["Size".to_string()]);
        assert_eq!(pre.target.to_vec(), vec![10.0, 20.0, 30.0]);
        assert_eq!(pre.features[[1, 0]], 2.0);
    }

    #[test]
    fn test_categorical_first_seen_codes() {
        let df = df!(
            "Effort" => &[1.0, 2.0, 3.0, 4.0],
            "Team" => &["B", "A", "B", "C"]
        )
        .unwrap();

        let pre = preprocess(&df, "Effort").unwrap();
        let team: Vec<f64> = pre.features.column(0).to_vec();
        assert_eq!(team, vec![0.0, 1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_categorical_missing_is_own_category() {
        let df = df!(
            "Effort" => &[1.0, 2.0, 3.0],
            "Team" => &[Some("A"), None, Some("A")]
        )
        .unwrap();

        let pre = preprocess(&df, "Effort").unwrap();
        let team: Vec<f64> = pre.features.column(0).to_vec();
        assert_eq!(team, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_mean_imputation() {
        let df = df!(
            "Effort" => &[1.0, 2.0, 3.0],
            "Size" => &[Some(2.0), None, Some(4.0)]
        )
        .unwrap();

        let pre = preprocess(&df, "Effort").unwrap();
        let size: Vec<f64> = pre.features.column(0).to_vec();
        assert_eq!(size, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_no_features_left() {
        let df = df!("Effort" => &[1.0, 2.0]).unwrap();
        let err = preprocess(&df, "Effort").unwrap_err();
        assert!(matches!(err, EffortError::Feature(_)));
    }

    #[test]
    fn test_target_coercion_failure() {
        let df = df!(
            "Effort" => &["ten", "20"],
            "Size" => &[1.0, 2.0]
        )
        .unwrap();

        let err = preprocess(&df, "Effort").unwrap_err();
        assert!(matches!(err, EffortError::Data(_)));
    }

    #[test]
    fn test_drop_feature() {
        let df = df!(
            "Effort" => &[1.0, 2.0],
            "Size" => &[1.0, 2.0],
            "Region" => &["N", "S"]
        )
        .unwrap();

        let mut pre = preprocess(&df, "Effort").unwrap();
        pre.drop_feature("Region");
        assert_eq!(pre.feature_names, vec!["Size".to_string()]);
        assert_eq!(pre.features.ncols(), 1);
        // Dropping an absent column is a no-op
        pre.drop_feature("Region");
        assert_eq!(pre.features.ncols(), 1);
    }
}
