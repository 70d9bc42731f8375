//! Random forest classifier

use crate::error::{Result, RiskmlError};
use super::decision_tree::DecisionTree;
use ndarray::{Array1, Array2};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bagged ensemble of gini decision trees with majority voting.
///
/// Trees are built in parallel on the rayon pool; each tree derives its own
/// seed from the forest seed, so the fitted ensemble is independent of
/// scheduling order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: Option<u64>,
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_state: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Fit the forest: bootstrap sample per tree, sqrt-feature subsampling.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(RiskmlError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(RiskmlError::FitFailure(
                "cannot fit random forest on zero samples".to_string(),
            ));
        }
        if self.n_estimators == 0 {
            return Err(RiskmlError::FitFailure(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        let max_features = ((n_features as f64).sqrt().ceil() as usize).max(1);
        let base_seed = self.random_state.unwrap_or(42);

        let trees: Result<Vec<DecisionTree>> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                // Bootstrap sample with replacement
                let sample_indices: Vec<usize> = (0..n_samples)
                    .map(|_| (rng.next_u64() as usize) % n_samples)
                    .collect();

                let x_boot = x.select(ndarray::Axis(0), &sample_indices);
                let y_boot: Array1<f64> =
                    Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_random_state(seed);
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect();

        self.trees = trees?;
        Ok(self)
    }

    /// Predict by majority vote across trees.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(RiskmlError::ModelNotFitted);
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let mut votes: HashMap<i64, usize> = HashMap::new();
                for preds in &all_predictions {
                    *votes.entry(preds[i].round() as i64).or_insert(0) += 1;
                }
                votes
                    .into_iter()
                    // Vote ties resolve to the smaller class label
                    .max_by_key(|&(class, count)| (count, std::cmp::Reverse(class)))
                    .map(|(class, _)| class as f64)
                    .unwrap_or(0.0)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn clustered_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [0.1, 0.3],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
            [0.9, 1.1],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_fit_predict() {
        let (x, y) = clustered_data();
        let mut rf = RandomForestClassifier::new(20).with_random_state(42);
        rf.fit(&x, &y).unwrap();
        assert_eq!(rf.n_trees(), 20);

        let predictions = rf.predict(&x).unwrap();
        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy >= 0.8, "accuracy too low: {}", accuracy);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let (x, y) = clustered_data();

        let mut a = RandomForestClassifier::new(10).with_random_state(7);
        let mut b = RandomForestClassifier::new(10).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_zero_estimators_is_fit_failure() {
        let (x, y) = clustered_data();
        let mut rf = RandomForestClassifier::new(0);
        assert!(matches!(rf.fit(&x, &y), Err(RiskmlError::FitFailure(_))));
    }

    #[test]
    fn test_unfitted_predict_is_error() {
        let rf = RandomForestClassifier::new(5);
        let x = array![[0.0, 0.0]];
        assert!(matches!(rf.predict(&x), Err(RiskmlError::ModelNotFitted)));
    }
}
