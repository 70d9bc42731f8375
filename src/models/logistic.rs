//! Logistic regression for binary classification

use crate::error::{Result, RiskmlError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Logistic regression fit by gradient descent with L2 regularization.
///
/// Regularization follows the inverse-strength convention: `alpha = 1 / c`,
/// so larger `c` means weaker regularization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    coefficients: Option<Array1<f64>>,
    intercept: Option<f64>,
    /// Inverse regularization strength
    pub c: f64,
    /// Maximum gradient descent iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Gradient descent step size
    pub learning_rate: f64,
    is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            c: 1.0,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            is_fitted: false,
        }
    }

    /// Set inverse regularization strength (must be positive).
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Fit by full-batch gradient descent.
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
                "cannot fit logistic regression on zero samples".to_string(),
            ));
        }
        if !(self.c > 0.0) {
            return Err(RiskmlError::FitFailure(format!(
                "inverse regularization c must be positive, got {}",
                self.c
            )));
        }

        let alpha = 1.0 / self.c;
        let lr = self.learning_rate;

        let mut weights = Array1::zeros(n_features);
        let mut bias = 0.0;

        for _iter in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples as f64) + alpha * &weights;
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(RiskmlError::FitFailure(
                "gradient descent diverged to non-finite weights".to_string(),
            ));
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.is_fitted = true;
        Ok(self)
    }

    /// Predict positive-class probabilities.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(RiskmlError::ModelNotFitted)?;
        let intercept = self.intercept.unwrap_or(0.0);

        let linear = x.dot(coefficients) + intercept;
        Ok(Self::sigmoid(&linear))
    }

    /// Predict class labels (0.0 / 1.0).
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }
}
