//! Multi-layer perceptron classifier
//!
//! Feedforward network with softmax output and cross-entropy loss, trained by
//! mini-batch gradient descent with momentum.

use crate::error::{Result, RiskmlError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Hidden-layer activation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    ReLU,
    Tanh,
}

impl Activation {
    pub fn name(&self) -> &'static str {
        match self {
            Activation::ReLU => "relu",
            Activation::Tanh => "tanh",
        }
    }

    fn apply(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::ReLU => z.mapv(|v| v.max(0.0)),
            Activation::Tanh => z.mapv(|v| v.tanh()),
        }
    }

    fn derivative(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::ReLU => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Tanh => {
                let t = z.mapv(|v| v.tanh());
                1.0 - &t * &t
            }
        }
    }
}

/// MLP hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpConfig {
    pub hidden_layers: Vec<usize>,
    pub activation: Activation,
    pub learning_rate: f64,
    pub max_epochs: usize,
    pub batch_size: usize,
    /// L2 weight decay
    pub alpha: f64,
    pub momentum: f64,
    pub random_state: Option<u64>,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![32],
            activation: Activation::ReLU,
            learning_rate: 0.01,
            max_epochs: 200,
            batch_size: 32,
            alpha: 1e-4,
            momentum: 0.9,
            random_state: Some(42),
        }
    }
}

/// Multi-layer perceptron classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpClassifier {
    config: MlpConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    n_features: usize,
    classes: Vec<i64>,
    is_fitted: bool,
}

impl MlpClassifier {
    pub fn new(config: MlpConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
            classes: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &MlpConfig {
        &self.config
    }

    /// Fit the network.
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
                "cannot fit MLP on zero samples".to_string(),
            ));
        }
        if self.config.hidden_layers.is_empty() {
            return Err(RiskmlError::FitFailure(
                "MLP requires at least one hidden layer".to_string(),
            ));
        }

        self.n_features = x.ncols();

        let mut classes: Vec<i64> = y.iter().map(|&v| v.round() as i64).collect();
        classes.sort_unstable();
        classes.dedup();
        self.classes = classes;

        self.initialize_weights();

        let mut rng = match self.config.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let y_onehot = self.to_onehot(y);
        let batch_size = self.config.batch_size.max(1);

        let mut velocities_w: Vec<Array2<f64>> = self
            .weights
            .iter()
            .map(|w| Array2::zeros(w.raw_dim()))
            .collect();
        let mut velocities_b: Vec<Array1<f64>> = self
            .biases
            .iter()
            .map(|b| Array1::zeros(b.len()))
            .collect();

        for _epoch in 0..self.config.max_epochs {
            let mut indices: Vec<usize> = (0..n_samples).collect();
            indices.shuffle(&mut rng);

            for batch_start in (0..n_samples).step_by(batch_size) {
                let batch_end = (batch_start + batch_size).min(n_samples);
                let batch_indices = &indices[batch_start..batch_end];

                let x_batch = gather_rows(x, batch_indices);
                let y_batch = gather_rows(&y_onehot, batch_indices);

                let (activations, z_values) = self.forward(&x_batch);
                let gradients = self.backward(&y_batch, &activations, &z_values);

                for (i, (grad_w, grad_b)) in gradients.into_iter().enumerate() {
                    velocities_w[i] = &velocities_w[i] * self.config.momentum
                        - &grad_w * self.config.learning_rate;
                    velocities_b[i] = &velocities_b[i] * self.config.momentum
                        - &grad_b * self.config.learning_rate;

                    self.weights[i] = &self.weights[i] + &velocities_w[i];
                    self.biases[i] = &self.biases[i] + &velocities_b[i];

                    // L2 weight decay
                    self.weights[i] = &self.weights[i]
                        * (1.0 - self.config.alpha * self.config.learning_rate);
                }
            }
        }

        if self
            .weights
            .iter()
            .any(|w| w.iter().any(|v| !v.is_finite()))
        {
            return Err(RiskmlError::FitFailure(
                "MLP training diverged to non-finite weights".to_string(),
            ));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Predict class labels.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;

        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                let max_idx = row
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| {
                        a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                // The output layer always carries at least two units, but a
                // one-class fit has a single known class; clamp the argmax
                let class_idx = max_idx.min(self.classes.len().saturating_sub(1));
                self.classes.get(class_idx).copied().unwrap_or(0) as f64
            })
            .collect())
    }

    /// Predict class probabilities (softmax output).
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(RiskmlError::ModelNotFitted);
        }
        let (activations, _) = self.forward(x);
        Ok(activations.last().cloned().unwrap_or_else(|| x.clone()))
    }

    fn initialize_weights(&mut self) {
        self.weights.clear();
        self.biases.clear();

        let mut rng = match self.config.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut layer_sizes = vec![self.n_features];
        layer_sizes.extend(&self.config.hidden_layers);
        layer_sizes.push(self.classes.len().max(2));

        for i in 0..layer_sizes.len() - 1 {
            let n_in = layer_sizes[i];
            let n_out = layer_sizes[i + 1];

            // Xavier initialization
            let scale = (2.0 / (n_in + n_out) as f64).sqrt();
            let weights: Vec<f64> = (0..n_in * n_out)
                .map(|_| rng.gen::<f64>() * 2.0 * scale - scale)
                .collect();

            self.weights
                .push(Array2::from_shape_vec((n_in, n_out), weights).unwrap_or_else(
                    |_| Array2::zeros((n_in, n_out)),
                ));
            self.biases.push(Array1::zeros(n_out));
        }
    }

    fn forward(&self, x: &Array2<f64>) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let mut activations = vec![x.clone()];
        let mut z_values = Vec::new();

        for (i, (w, b)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            let z = activations[activations.len() - 1].dot(w) + b;
            z_values.push(z.clone());

            let a = if i < self.weights.len() - 1 {
                self.config.activation.apply(&z)
            } else {
                softmax(&z)
            };
            activations.push(a);
        }

        (activations, z_values)
    }

    fn backward(
        &self,
        y_onehot: &Array2<f64>,
        activations: &[Array2<f64>],
        z_values: &[Array2<f64>],
    ) -> Vec<(Array2<f64>, Array1<f64>)> {
        let n = y_onehot.nrows() as f64;
        let mut gradients = Vec::new();

        // Softmax + cross-entropy gradient
        let mut delta = (&activations[activations.len() - 1] - y_onehot) / n;

        for i in (0..self.weights.len()).rev() {
            let a_prev = &activations[i];

            let grad_w = a_prev.t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            gradients.push((grad_w, grad_b));

            if i > 0 {
                let z = &z_values[i - 1];
                delta = delta.dot(&self.weights[i].t()) * self.config.activation.derivative(z);
            }
        }

        gradients.reverse();
        gradients
    }

    fn to_onehot(&self, y: &Array1<f64>) -> Array2<f64> {
        let n = y.len();
        let n_classes = self.classes.len().max(2);
        let mut onehot = Array2::zeros((n, n_classes));

        for (i, &label) in y.iter().enumerate() {
            let class_idx = self
                .classes
                .iter()
                .position(|&c| c == label.round() as i64)
                .unwrap_or(0);
            onehot[[i, class_idx]] = 1.0;
        }

        onehot
    }
}

fn softmax(z: &Array2<f64>) -> Array2<f64> {
    let mut result = z.clone();
    for mut row in result.rows_mut() {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp_sum: f64 = row.iter().map(|&v| (v - max).exp()).sum();
        for v in row.iter_mut() {
            *v = (*v - max).exp() / exp_sum;
        }
    }
    result
}

fn gather_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    x.select(Axis(0), indices)
}
