//! Random forest regression.
//!
//! # Design
//!
//! Each tree is a CART regression tree grown on a bootstrap sample until
//! nodes are pure or smaller than `min_samples_split`. Every feature is a
//! split candidate at every node; the split maximising the reduction in
//! squared error wins, with the threshold at the midpoint between adjacent
//! distinct values. The forest predicts the mean of its trees.
//!
//! Tree seeds are drawn from one PRNG seeded with the forest seed, so a fit
//! is reproducible for a given seed and input order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub seed: u64,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self { n_estimators: 100, seed: 42, min_samples_split: 2 }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

/// A fitted regression tree stored as a flat node array; node 0 is the root.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Grow a tree on the rows of `x` listed in `samples` (repeats allowed).
    pub fn fit(x: &[Vec<f64>], y: &[f64], samples: Vec<usize>, min_samples_split: usize) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, y, samples, min_samples_split.max(2));
        tree
    }

    fn grow(&mut self, x: &[Vec<f64>], y: &[f64], samples: Vec<usize>, min_split: usize) -> usize {
        let id = self.nodes.len();
        let mean = samples.iter().map(|&i| y[i]).sum::<f64>() / samples.len().max(1) as f64;
        self.nodes.push(Node::Leaf { value: mean });

        if samples.len() < min_split {
            return id;
        }
        let Some(split) = best_split(x, y, &samples) else {
            return id;
        };

        let (left, right): (Vec<usize>, Vec<usize>) =
            samples.into_iter().partition(|&i| x[i][split.feature] <= split.threshold);
        let left = self.grow(x, y, left, min_split);
        let right = self.grow(x, y, right, min_split);
        self.nodes[id] = Node::Split { feature: split.feature, threshold: split.threshold, left, right };
        id
    }

    #[must_use]
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if features[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// Split with the largest squared-error reduction, if any reduces it.
fn best_split(x: &[Vec<f64>], y: &[f64], samples: &[usize]) -> Option<BestSplit> {
    let n = samples.len() as f64;
    let total_sum: f64 = samples.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = samples.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n;
    if parent_sse <= f64::EPSILON {
        return None;
    }

    let n_features = x.get(samples[0]).map_or(0, Vec::len);
    let mut best: Option<BestSplit> = None;
    let mut order = samples.to_vec();

    for feature in 0..n_features {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 0..order.len() - 1 {
            let yi = y[order[k]];
            left_sum += yi;
            left_sq += yi * yi;

            let here = x[order[k]][feature];
            let next = x[order[k + 1]][feature];
            if here == next {
                continue;
            }

            let n_left = (k + 1) as f64;
            let n_right = n - n_left;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left) + (right_sq - right_sum * right_sum / n_right);
            let gain = parent_sse - sse;

            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                let mut threshold = here + (next - here) / 2.0;
                // Midpoint can round up to `next` for adjacent floats.
                if threshold >= next {
                    threshold = here;
                }
                best = Some(BestSplit { feature, threshold, gain });
            }
        }
    }
    best
}

/// Bagged ensemble of [`RegressionTree`]s.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Fit on rows `x` with targets `y`.
    ///
    /// # Errors
    ///
    /// Returns `Err` on empty input, mismatched lengths or ragged rows.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Result<Self> {
        if x.is_empty() {
            return Err(AnalysisError::InsufficientData("no training rows".into()));
        }
        if x.len() != y.len() {
            return Err(AnalysisError::Model(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
            return Err(AnalysisError::Model("feature rows must be non-empty and equal length".into()));
        }
        if params.n_estimators == 0 {
            return Err(AnalysisError::Model("n_estimators must be positive".into()));
        }

        let n = x.len();
        let mut seeds = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(seeds.gen());
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, bootstrap, params.min_samples_split)
            })
            .collect();

        Ok(Self { trees, n_features })
    }

    #[must_use]
    pub fn predict(&self, features: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        total / self.trees.len() as f64
    }

    #[must_use]
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict(r)).collect()
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_fits_step_function() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { 1.0 } else { 3.0 }).collect();
        let tree = RegressionTree::fit(&x, &y, (0..10).collect(), 2);
        assert_eq!(tree.predict(&[2.0]), 1.0);
        assert_eq!(tree.predict(&[7.0]), 3.0);
        assert_eq!(tree.predict(&[4.5]), 1.0);
        assert_eq!(tree.n_nodes(), 3);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, 1.0]).collect();
        let y = vec![2.5; 6];
        let tree = RegressionTree::fit(&x, &y, (0..6).collect(), 2);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[100.0, 0.0]), 2.5);
    }

    #[test]
    fn test_forest_is_deterministic() {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let y: Vec<f64> = (0..30).map(|i| 0.5 * i as f64).collect();
        let params = ForestParams { n_estimators: 20, ..ForestParams::default() };

        let a = RandomForestRegressor::fit(&x, &y, &params).unwrap();
        let b = RandomForestRegressor::fit(&x, &y, &params).unwrap();
        assert_eq!(a.predict_batch(&x), b.predict_batch(&x));
        assert_eq!(a.n_trees(), 20);
        assert_eq!(a.n_features(), 2);

        // Interpolates a monotone trend reasonably well.
        let p = a.predict(&[15.0, 1.0]);
        assert!((p - 7.5).abs() < 1.5, "prediction {}", p);
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let params = ForestParams::default();
        assert!(RandomForestRegressor::fit(&[], &[], &params).is_err());
        assert!(RandomForestRegressor::fit(&[vec![1.0]], &[1.0, 2.0], &params).is_err());
        assert!(RandomForestRegressor::fit(&[vec![1.0], vec![]], &[1.0, 2.0], &params).is_err());
    }
}
