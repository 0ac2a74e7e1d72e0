//! Error types for the effort estimation engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EffortError>;

/// Main error type for the engine
///
/// Failures in loading, target resolution, or feature availability are
/// fatal to a whole analysis call; failures scoped to one candidate model,
/// one domain group, or the outlier step are absorbed by their component
/// and never surface through this type at the top level.
#[derive(Error, Debug)]
pub enum EffortError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Feature error: {0}")]
    Feature(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for EffortError {
    fn from(err: polars::error::PolarsError) -> Self {
        EffortError::Data(err.to_string())
    }
}

impl From<ndarray::ShapeError> for EffortError {
    fn from(err: ndarray::ShapeError) -> Self {
        EffortError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
