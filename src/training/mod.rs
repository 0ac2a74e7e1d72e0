//! Regression model training
//!
//! Native implementations of the candidate regressors:
//! - Regression trees and random forests
//! - Extra Trees (extremely randomized trees)
//! - Gradient boosting
//! - Ordinary least squares
//!
//! plus the seeded k-fold splitter used by the evaluator.

pub mod candidates;
pub mod cross_validation;
pub mod decision_tree;
pub mod extra_trees;
pub mod gradient_boosting;
pub mod linear_models;
pub mod random_forest;

pub use candidates::{CandidateModel, FittedCandidate};
pub use cross_validation::{CvSplit, KFold};
pub use decision_tree::{RegressionTree, TreeNode};
pub use extra_trees::ExtraTrees;
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use linear_models::LinearRegression;
pub use random_forest::RandomForest;
