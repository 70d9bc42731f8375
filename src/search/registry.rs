//! Candidate model families and their hyperparameter search domains
//!
//! The registry is a fixed, ordered collection: order drives iteration,
//! logging, and the winner tie-break, nothing else.

use crate::error::Result;
use crate::models::{
    Activation, FittedModel, LogisticRegression, MlpClassifier, MlpConfig,
    RandomForestClassifier,
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hyperparameter domain for the linear discriminative family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticGrid {
    /// Inverse regularization strengths
    pub c: Vec<f64>,
    pub max_iter: Vec<usize>,
}

impl Default for LogisticGrid {
    fn default() -> Self {
        Self {
            c: vec![0.01, 0.1, 1.0, 10.0, 100.0],
            max_iter: vec![500, 1000, 2000],
        }
    }
}

/// Hyperparameter domain for the ensemble-of-trees family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestGrid {
    pub n_estimators: Vec<usize>,
    /// `None` means unbounded depth
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
}

impl Default for ForestGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![50, 100, 200],
            max_depth: vec![None, Some(10), Some(20)],
            min_samples_split: vec![2, 5, 10],
        }
    }
}

/// Hyperparameter domain for the multi-layer nonlinear family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpGrid {
    pub hidden_layers: Vec<Vec<usize>>,
    pub activation: Vec<Activation>,
    pub max_epochs: Vec<usize>,
}

impl Default for MlpGrid {
    fn default() -> Self {
        Self {
            hidden_layers: vec![vec![32], vec![64, 32], vec![128, 64, 32]],
            activation: vec![Activation::ReLU, Activation::Tanh],
            max_epochs: vec![200, 500, 1000],
        }
    }
}

/// One candidate family plus its search domain.
///
/// A closed set known at definition time; adding a family means adding a
/// variant here and teaching the engine nothing new.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CandidateSpec {
    Logistic(LogisticGrid),
    Forest(ForestGrid),
    Mlp(MlpGrid),
}

impl CandidateSpec {
    /// Family display name, used in reports and experiment records.
    pub fn name(&self) -> &'static str {
        match self {
            CandidateSpec::Logistic(_) => "Logistic Regression",
            CandidateSpec::Forest(_) => "Random Forest",
            CandidateSpec::Mlp(_) => "Neural Network",
        }
    }

    /// Short identifier for run ids and artifact names.
    pub fn slug(&self) -> &'static str {
        match self {
            CandidateSpec::Logistic(_) => "logistic-regression",
            CandidateSpec::Forest(_) => "random-forest",
            CandidateSpec::Mlp(_) => "neural-network",
        }
    }

    /// Enumerate the full finite configuration grid, in a stable order.
    pub fn enumerate(&self) -> Vec<CandidateParams> {
        match self {
            CandidateSpec::Logistic(grid) => {
                let mut params = Vec::new();
                for &c in &grid.c {
                    for &max_iter in &grid.max_iter {
                        params.push(CandidateParams::Logistic { c, max_iter });
                    }
                }
                params
            }
            CandidateSpec::Forest(grid) => {
                let mut params = Vec::new();
                for &n_estimators in &grid.n_estimators {
                    for &max_depth in &grid.max_depth {
                        for &min_samples_split in &grid.min_samples_split {
                            params.push(CandidateParams::Forest {
                                n_estimators,
                                max_depth,
                                min_samples_split,
                            });
                        }
                    }
                }
                params
            }
            CandidateSpec::Mlp(grid) => {
                let mut params = Vec::new();
                for hidden_layers in &grid.hidden_layers {
                    for &activation in &grid.activation {
                        for &max_epochs in &grid.max_epochs {
                            params.push(CandidateParams::Mlp {
                                hidden_layers: hidden_layers.clone(),
                                activation,
                                max_epochs,
                            });
                        }
                    }
                }
                params
            }
        }
    }
}

/// One sampled configuration from a candidate's domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CandidateParams {
    Logistic {
        c: f64,
        max_iter: usize,
    },
    Forest {
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
    },
    Mlp {
        hidden_layers: Vec<usize>,
        activation: Activation,
        max_epochs: usize,
    },
}

impl CandidateParams {
    /// Fit this configuration on the given data.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>, seed: u64) -> Result<FittedModel> {
        match self {
            CandidateParams::Logistic { c, max_iter } => {
                let mut model = LogisticRegression::new()
                    .with_c(*c)
                    .with_max_iter(*max_iter);
                model.fit(x, y)?;
                Ok(FittedModel::Logistic(model))
            }
            CandidateParams::Forest {
                n_estimators,
                max_depth,
                min_samples_split,
            } => {
                let mut model = RandomForestClassifier::new(*n_estimators)
                    .with_min_samples_split(*min_samples_split)
                    .with_random_state(seed);
                if let Some(depth) = max_depth {
                    model = model.with_max_depth(*depth);
                }
                model.fit(x, y)?;
                Ok(FittedModel::Forest(model))
            }
            CandidateParams::Mlp {
                hidden_layers,
                activation,
                max_epochs,
            } => {
                let config = MlpConfig {
                    hidden_layers: hidden_layers.clone(),
                    activation: *activation,
                    max_epochs: *max_epochs,
                    random_state: Some(seed),
                    ..Default::default()
                };
                let mut model = MlpClassifier::new(config);
                model.fit(x, y)?;
                Ok(FittedModel::Mlp(model))
            }
        }
    }

    /// Flatten to name→value strings for experiment records.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        match self {
            CandidateParams::Logistic { c, max_iter } => {
                map.insert("C".to_string(), c.to_string());
                map.insert("max_iter".to_string(), max_iter.to_string());
            }
            CandidateParams::Forest {
                n_estimators,
                max_depth,
                min_samples_split,
            } => {
                map.insert("n_estimators".to_string(), n_estimators.to_string());
                map.insert(
                    "max_depth".to_string(),
                    max_depth.map_or("none".to_string(), |d| d.to_string()),
                );
                map.insert(
                    "min_samples_split".to_string(),
                    min_samples_split.to_string(),
                );
            }
            CandidateParams::Mlp {
                hidden_layers,
                activation,
                max_epochs,
            } => {
                let layers: Vec<String> =
                    hidden_layers.iter().map(|l| l.to_string()).collect();
                map.insert(
                    "hidden_layer_sizes".to_string(),
                    format!("({})", layers.join(", ")),
                );
                map.insert("activation".to_string(), activation.name().to_string());
                map.insert("max_iter".to_string(), max_epochs.to_string());
            }
        }
        map
    }
}

/// Fixed, ordered collection of candidate families
#[derive(Debug, Clone)]
pub struct CandidateRegistry {
    specs: Vec<CandidateSpec>,
}

impl CandidateRegistry {
    pub fn new(specs: Vec<CandidateSpec>) -> Self {
        Self { specs }
    }

    /// The three default families with the domains the risk classifier
    /// searches over.
    pub fn default_families() -> Self {
        Self::new(vec![
            CandidateSpec::Logistic(LogisticGrid::default()),
            CandidateSpec::Forest(ForestGrid::default()),
            CandidateSpec::Mlp(MlpGrid::default()),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for CandidateRegistry {
    fn default() -> Self {
        Self::default_families()
    }
}
