//! Candidate estimators and evaluation metrics
//!
//! The pipeline treats estimators as opaque: each family fits on a feature
//! matrix and predicts encoded class labels. [`FittedModel`] is the closed set
//! of trained variants that can be promoted to a persisted artifact.

pub mod metrics;
pub mod logistic;
pub mod decision_tree;
pub mod random_forest;
pub mod neural_network;

pub use metrics::ClassificationMetrics;
pub use logistic::LogisticRegression;
pub use decision_tree::DecisionTree;
pub use random_forest::RandomForestClassifier;
pub use neural_network::{Activation, MlpClassifier, MlpConfig};

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A trained estimator from one of the candidate families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedModel {
    Logistic(LogisticRegression),
    Forest(RandomForestClassifier),
    Mlp(MlpClassifier),
}

impl FittedModel {
    /// Predict encoded class labels.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            FittedModel::Logistic(model) => model.predict(x),
            FittedModel::Forest(model) => model.predict(x),
            FittedModel::Mlp(model) => model.predict(x),
        }
    }

    /// Human-readable family name, matching the candidate registry.
    pub fn family_name(&self) -> &'static str {
        match self {
            FittedModel::Logistic(_) => "Logistic Regression",
            FittedModel::Forest(_) => "Random Forest",
            FittedModel::Mlp(_) => "Neural Network",
        }
    }

    /// Evaluate held-out metrics against encoded true labels.
    pub fn evaluate(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<ClassificationMetrics> {
        let y_pred = self.predict(x)?;
        Ok(ClassificationMetrics::compute(y, &y_pred))
    }
}
