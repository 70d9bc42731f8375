//! Per-column standardization for feature matrices

use crate::error::{Result, RiskmlError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Standard scaler: (x - mean) / std per column.
///
/// Fit exclusively on the training matrix; the identical state is applied to
/// the test matrix. Columns with zero spread scale by 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Option<Array1<f64>>,
    stds: Option<Array1<f64>>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    pub fn new() -> Self {
        Self { means: None, stds: None }
    }

    /// Fit per-column mean and standard deviation (ddof = 1).
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(RiskmlError::Transformation(
                "cannot fit scaler on zero training rows".to_string(),
            ));
        }

        let means = x.mean_axis(Axis(0)).ok_or_else(|| {
            RiskmlError::Transformation("failed to compute column means".to_string())
        })?;

        let ddof = if x.nrows() > 1 { 1.0 } else { 0.0 };
        let stds = x
            .std_axis(Axis(0), ddof)
            .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

        self.means = Some(means);
        self.stds = Some(stds);
        Ok(self)
    }

    /// Apply the fitted transform to a matrix with the same column count.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (means, stds) = match (&self.means, &self.stds) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(RiskmlError::ModelNotFitted),
        };

        if x.ncols() != means.len() {
            return Err(RiskmlError::Shape {
                expected: format!("{} columns", means.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (j, mut col) in out.columns_mut().into_iter().enumerate() {
            let (m, s) = (means[j], stds[j]);
            col.mapv_inplace(|v| (v - m) / s);
        }
        Ok(out)
    }

    /// Fit on `x` and transform it in one step.
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Fitted per-column means, if fitted.
    pub fn means(&self) -> Option<&Array1<f64>> {
        self.means.as_ref()
    }

    /// Fitted per-column standard deviations, if fitted.
    pub fn stds(&self) -> Option<&Array1<f64>> {
        self.stds.as_ref()
    }
}
