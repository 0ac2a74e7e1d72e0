//! Extremely randomized trees regressor
//!
//! Unlike the random forest, which searches every candidate threshold,
//! extra trees draw one uniformly random threshold per considered feature
//! and keep the best. No bootstrapping: each tree sees the full dataset.

use crate::error::{EffortError, Result};
use ndarray::{Array1, Array2};
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
enum ExtraTreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<ExtraTreeNode>,
        right: Box<ExtraTreeNode>,
    },
}

impl ExtraTreeNode {
    fn predict_sample(&self, sample: &[f64]) -> f64 {
        match self {
            ExtraTreeNode::Leaf { value } => *value,
            ExtraTreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.predict_sample(sample)
                } else {
                    right.predict_sample(sample)
                }
            }
        }
    }
}

/// Extra trees regression model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraTrees {
    trees: Vec<ExtraTreeNode>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: Option<u64>,
    n_features: usize,
    is_fitted: bool,
}

impl ExtraTrees {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: Some(20),
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_state: None,
            n_features: 0,
            is_fitted: false,
        }
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn build_tree(
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        max_depth: Option<usize>,
        min_samples_split: usize,
        min_samples_leaf: usize,
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> ExtraTreeNode {
        let n = indices.len();

        if n < min_samples_split || n <= 1 || max_depth.map_or(false, |d| depth >= d) {
            return ExtraTreeNode::Leaf {
                value: Self::leaf_mean(y, indices),
            };
        }

        let first_y = y[indices[0]];
        if indices.iter().all(|&i| (y[i] - first_y).abs() < 1e-15) {
            return ExtraTreeNode::Leaf { value: first_y };
        }

        let n_features = x.ncols();

        // One random threshold per feature; keep the lowest-variance split
        let mut best_feature = 0;
        let mut best_threshold = 0.0;
        let mut best_score = f64::MAX;
        let mut found_valid_split = false;

        for f in 0..n_features {
            let mut fmin = f64::MAX;
            let mut fmax = f64::MIN;
            for &i in indices {
                let v = x[[i, f]];
                if v < fmin {
                    fmin = v;
                }
                if v > fmax {
                    fmax = v;
                }
            }

            if (fmax - fmin).abs() < 1e-15 {
                continue;
            }

            let r = (rng.next_u64() as f64) / (u64::MAX as f64);
            let threshold = fmin + r * (fmax - fmin);

            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                indices.iter().partition(|&&i| x[[i, f]] <= threshold);

            if left_idx.len() < min_samples_leaf || right_idx.len() < min_samples_leaf {
                continue;
            }

            let score = Self::mse_split(y, &left_idx, &right_idx);
            if score < best_score {
                best_score = score;
                best_feature = f;
                best_threshold = threshold;
                found_valid_split = true;
            }
        }

        if !found_valid_split {
            return ExtraTreeNode::Leaf {
                value: Self::leaf_mean(y, indices),
            };
        }

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best_feature]] <= best_threshold);

        let left = Self::build_tree(
            x,
            y,
            &left_idx,
            max_depth,
            min_samples_split,
            min_samples_leaf,
            depth + 1,
            rng,
        );
        let right = Self::build_tree(
            x,
            y,
            &right_idx,
            max_depth,
            min_samples_split,
            min_samples_leaf,
            depth + 1,
            rng,
        );

        ExtraTreeNode::Split {
            feature: best_feature,
            threshold: best_threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn leaf_mean(y: &Array1<f64>, indices: &[usize]) -> f64 {
        let sum: f64 = indices.iter().map(|&i| y[i]).sum();
        sum / indices.len().max(1) as f64
    }

    fn mse_split(y: &Array1<f64>, left: &[usize], right: &[usize]) -> f64 {
        let n = (left.len() + right.len()) as f64;
        let lm = Self::mse_impurity(y, left);
        let rm = Self::mse_impurity(y, right);
        (left.len() as f64 * lm + right.len() as f64 * rm) / n
    }

    fn mse_impurity(y: &Array1<f64>, indices: &[usize]) -> f64 {
        let n = indices.len() as f64;
        if n == 0.0 {
            return 0.0;
        }
        let mean: f64 = indices.iter().map(|&i| y[i]).sum::<f64>() / n;
        indices.iter().map(|&i| (y[i] - mean).powi(2)).sum::<f64>() / n
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(EffortError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(EffortError::Validation(
                "cannot fit extra trees on zero samples".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let all_indices: Vec<usize> = (0..n_samples).collect();

        let base_seed = self.random_state.unwrap_or(42);
        let max_depth = self.max_depth;
        let min_split = self.min_samples_split;
        let min_leaf = self.min_samples_leaf;

        let trees: Vec<ExtraTreeNode> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                Self::build_tree(
                    x,
                    y,
                    &all_indices,
                    max_depth,
                    min_split,
                    min_leaf,
                    0,
                    &mut rng,
                )
            })
            .collect();

        self.trees = trees;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(EffortError::ModelNotFitted);
        }

        let n_samples = x.nrows();
        let mut predictions = Array1::zeros(n_samples);

        for i in 0..n_samples {
            let sample = x.row(i).to_vec();
            let sum: f64 = self.trees.iter().map(|t| t.predict_sample(&sample)).sum();
            predictions[i] = sum / self.trees.len() as f64;
        }

        Ok(predictions)
    }

    /// Feature importances by split-usage counts across all trees
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if !self.is_fitted || self.n_features == 0 {
            return None;
        }
        let mut counts = vec![0.0f64; self.n_features];
        for tree in &self.trees {
            Self::count_splits(tree, &mut counts);
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            for c in counts.iter_mut() {
                *c /= total;
            }
        }
        Some(Array1::from_vec(counts))
    }

    fn count_splits(node: &ExtraTreeNode, counts: &mut [f64]) {
        match node {
            ExtraTreeNode::Leaf { .. } => {}
            ExtraTreeNode::Split {
                feature,
                left,
                right,
                ..
            } => {
                if *feature < counts.len() {
                    counts[*feature] += 1.0;
                }
                Self::count_splits(left, counts);
                Self::count_splits(right, counts);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regressor_fits_line() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![2.0, 4.0, 6.0, 8.0, 10.0];

        let mut model = ExtraTrees::new(50).with_random_state(42);
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        let ym = y.mean().unwrap();
        let ss_res = (&preds - &y).mapv(|v| v * v).sum();
        let ss_tot = y.mapv(|v| (v - ym).powi(2)).sum();
        let r2 = 1.0 - ss_res / ss_tot;
        assert!(r2 > 0.8, "R2 = {}", r2);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let x = array![[1.0, 3.0], [2.0, 1.0], [3.0, 4.0], [4.0, 1.0], [5.0, 5.0]];
        let y = array![2.0, 4.0, 6.0, 8.0, 10.0];

        let mut a = ExtraTrees::new(30).with_random_state(7);
        let mut b = ExtraTrees::new(30).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_importances_cover_used_features() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let mut model = ExtraTrees::new(30).with_random_state(42);
        model.fit(&x, &y).unwrap();

        let imp = model.feature_importances().unwrap();
        assert_eq!(imp.len(), 2);
        // Constant feature can never host a split
        assert_eq!(imp[1], 0.0);
    }
}
