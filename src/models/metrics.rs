//! Classification evaluation metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Held-out evaluation metrics for one fitted classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    /// Fraction of correct predictions
    pub accuracy: f64,
    /// Per-class F1 averaged with class-frequency weights
    pub weighted_f1: f64,
}

impl ClassificationMetrics {
    /// Compute accuracy and weighted F1 over the observed label set.
    ///
    /// Classes are taken from the union of true and predicted labels so a
    /// class the model never predicts still contributes its zero F1 at its
    /// true-label weight.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len();
        if n == 0 {
            return Self { accuracy: 0.0, weighted_f1: 0.0 };
        }

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (t.round() - p.round()).abs() < 0.5)
            .count();
        let accuracy = correct as f64 / n as f64;

        // Per-class confusion counts keyed by rounded label
        let mut counts: BTreeMap<i64, ClassCounts> = BTreeMap::new();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let t = t.round() as i64;
            let p = p.round() as i64;
            if t == p {
                counts.entry(t).or_default().tp += 1;
            } else {
                counts.entry(p).or_default().fp += 1;
                counts.entry(t).or_default().fn_ += 1;
            }
        }

        let mut weighted_f1 = 0.0;
        for counts in counts.values() {
            let support = counts.tp + counts.fn_;
            if support == 0 {
                continue;
            }
            weighted_f1 += counts.f1() * support as f64 / n as f64;
        }

        Self { accuracy, weighted_f1 }
    }
}

#[derive(Debug, Default)]
struct ClassCounts {
    tp: usize,
    fp: usize,
    fn_: usize,
}

impl ClassCounts {
    fn f1(&self) -> f64 {
        let precision = if self.tp + self.fp > 0 {
            self.tp as f64 / (self.tp + self.fp) as f64
        } else {
            0.0
        };
        let recall = if self.tp + self.fn_ > 0 {
            self.tp as f64 / (self.tp + self.fn_) as f64
        } else {
            0.0
        };
        if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        }
    }
}
