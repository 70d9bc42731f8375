//! Decision tree classifier (CART with gini impurity)
//!
//! Building block for the random forest; supports feature subsampling so
//! forest trees decorrelate.

use crate::error::{Result, RiskmlError};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        prediction: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Classification tree with gini splitting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<Node>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features considered per split; all features when `None`
    pub max_features: Option<usize>,
    pub random_state: Option<u64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
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

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(RiskmlError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(RiskmlError::FitFailure(
                "cannot fit decision tree on zero samples".to_string(),
            ));
        }

        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_node(x, y, &indices, 0, &mut rng));
        Ok(self)
    }

    fn build_node(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> Node {
        let depth_reached = self.max_depth.map(|d| depth >= d).unwrap_or(false);
        if depth_reached
            || indices.len() < self.min_samples_split
            || gini(y, indices) == 0.0
        {
            return Node::Leaf { prediction: majority_class(y, indices) };
        }

        match self.best_split(x, y, indices, rng) {
            Some((feature, threshold, left_idx, right_idx)) => Node::Split {
                feature,
                threshold,
                left: Box::new(self.build_node(x, y, &left_idx, depth + 1, rng)),
                right: Box::new(self.build_node(x, y, &right_idx, depth + 1, rng)),
            },
            None => Node::Leaf { prediction: majority_class(y, indices) },
        }
    }

    /// Best gini-weighted split over a (possibly subsampled) feature set.
    fn best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64, Vec<usize>, Vec<usize>)> {
        let n_features = x.ncols();
        let mut features: Vec<usize> = (0..n_features).collect();
        if let Some(k) = self.max_features {
            if k < n_features {
                features.shuffle(rng);
                features.truncate(k);
                features.sort_unstable();
            }
        }

        let parent_gini = gini(y, indices);
        let mut best: Option<(f64, usize, f64)> = None; // (impurity, feature, threshold)

        for &feature in &features {
            let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature]]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup();

            for pair in values.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;

                let (mut n_left, mut n_right) = (0usize, 0usize);
                let mut left_counts: HashMap<i64, usize> = HashMap::new();
                let mut right_counts: HashMap<i64, usize> = HashMap::new();
                for &i in indices {
                    let class = y[i].round() as i64;
                    if x[[i, feature]] <= threshold {
                        n_left += 1;
                        *left_counts.entry(class).or_insert(0) += 1;
                    } else {
                        n_right += 1;
                        *right_counts.entry(class).or_insert(0) += 1;
                    }
                }

                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let n = indices.len() as f64;
                let impurity = gini_from_counts(&left_counts, n_left) * n_left as f64 / n
                    + gini_from_counts(&right_counts, n_right) * n_right as f64 / n;

                let better = match best {
                    None => impurity < parent_gini,
                    Some((best_impurity, _, _)) => impurity < best_impurity,
                };
                if better {
                    best = Some((impurity, feature, threshold));
                }
            }
        }

        best.map(|(_, feature, threshold)| {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&i| x[[i, feature]] <= threshold);
            (feature, threshold, left_idx, right_idx)
        })
    }

    /// Predict class labels.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(RiskmlError::ModelNotFitted)?;

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let mut node = root;
                loop {
                    match node {
                        Node::Leaf { prediction } => return *prediction,
                        Node::Split { feature, threshold, left, right } => {
                            node = if x[[i, *feature]] <= *threshold { left } else { right };
                        }
                    }
                }
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

fn class_counts(y: &Array1<f64>, indices: &[usize]) -> HashMap<i64, usize> {
    let mut counts = HashMap::new();
    for &i in indices {
        *counts.entry(y[i].round() as i64).or_insert(0) += 1;
    }
    counts
}

fn gini(y: &Array1<f64>, indices: &[usize]) -> f64 {
    gini_from_counts(&class_counts(y, indices), indices.len())
}

fn gini_from_counts(counts: &HashMap<i64, usize>, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let sum_sq: f64 = counts
        .values()
        .map(|&c| {
            let p = c as f64 / n as f64;
            p * p
        })
        .sum();
    1.0 - sum_sq
}

fn majority_class(y: &Array1<f64>, indices: &[usize]) -> f64 {
    class_counts(y, indices)
        .into_iter()
        // Tie on count resolves to the smaller class label, deterministically
        .max_by_key(|&(class, count)| (count, std::cmp::Reverse(class)))
        .map(|(class, _)| class as f64)
        .unwrap_or(0.0)
}
