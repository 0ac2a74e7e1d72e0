//! Dataset loading and target column resolution

mod arff;

use crate::error::{EffortError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Load a dataset from a CSV or ARFF file into a DataFrame.
///
/// The format is chosen by file extension (case-insensitive). Every
/// failure mode - missing file, unsupported extension, malformed content,
/// empty table - is reported as [`EffortError::Load`]; parse errors never
/// propagate as anything else.
pub fn load_dataset(path: &str) -> Result<DataFrame> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let df = match ext.as_str() {
        "csv" => load_csv(path),
        "arff" => arff::read_arff(path),
        other => Err(EffortError::Load(format!(
            "unsupported dataset extension {:?} for {} (supported: csv, arff)",
            other, path
        ))),
    }
    .map_err(|e| match e {
        EffortError::Load(_) => e,
        other => EffortError::Load(format!("failed to load dataset at {}: {}", path, other)),
    })?;

    if df.height() == 0 || df.width() == 0 {
        return Err(EffortError::Load(format!("dataset at {} is empty", path)));
    }

    Ok(df)
}

fn load_csv(path: &str) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| EffortError::Load(e.to_string()))?;

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| EffortError::Load(e.to_string()))
}

/// Find the regression target: the first column (in table order) whose
/// name contains the case-insensitive substring "effort".
pub fn find_target_column(df: &DataFrame) -> Option<String> {
    df.get_columns()
        .iter()
        .map(|c| c.name().as_str())
        .find(|name| name.to_ascii_lowercase().contains("effort"))
        .map(|name| name.to_string())
}
