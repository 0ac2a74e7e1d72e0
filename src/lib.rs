//! effortml - Data-driven software effort estimation
//!
//! This crate provides a self-contained statistical pipeline that builds
//! effort-prediction models from a tabular cost-estimation dataset
//! (e.g. ISBSG/COSMIC exports):
//! - [`dataset`] - CSV/ARFF loading and target column resolution
//! - [`preprocessing`] - categorical encoding and mean imputation
//! - [`training`] - native regression models and k-fold splitting
//! - [`evaluation`] - cross-validated model comparison and selection
//! - [`anomaly`] - isolation-based outlier scoring over the full dataset
//! - [`calibration`] - per-domain model recalibration
//! - [`analysis`] - the single analysis entry point and result report

pub mod error;

pub mod dataset;
pub mod preprocessing;
pub mod training;
pub mod evaluation;
pub mod anomaly;
pub mod calibration;
pub mod analysis;

pub use error::{EffortError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analysis::{
        analyze, analyze_with_options, AnalysisOptions, AnalysisReport, AnalysisRequest,
    };
    pub use crate::error::{EffortError, Result};
    pub use crate::evaluation::{EvaluationConfig, ModelEvaluation};
    pub use crate::training::CandidateModel;
}
