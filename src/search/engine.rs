//! Randomized hyperparameter search for one candidate family

use crate::error::{Result, RiskmlError};
use crate::models::ClassificationMetrics;
use crate::models::FittedModel;
use super::cross_validation::{CrossValidator, CvSplit, CvStrategy};
use super::registry::{CandidateParams, CandidateSpec};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

/// Scaled matrices and encoded labels shared read-only by every candidate
/// search within one pipeline run.
#[derive(Debug, Clone)]
pub struct SearchData {
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
}

/// Search budget and determinism knobs
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Cross-validation fold count
    pub cv: usize,
    /// Sampled configurations per candidate
    pub n_iter: usize,
    /// Seed for sampling, fold shuffling, and estimator fitting
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { cv: 3, n_iter: 10, seed: 42 }
    }
}

/// The winning configuration for one candidate family.
///
/// `metrics` are held-out test metrics from a full-train refit; `cv_score` is
/// the mean fold score that selected the configuration and is reported only.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub family: String,
    pub best_params: CandidateParams,
    pub cv_score: f64,
    pub metrics: ClassificationMetrics,
    pub model: FittedModel,
}

/// Randomized search under k-fold cross-validation for one candidate
#[derive(Debug, Clone, Default)]
pub struct ModelSearchEngine {
    config: SearchConfig,
}

impl ModelSearchEngine {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Search one candidate's domain and return its best configuration.
    ///
    /// Samples up to `n_iter` distinct configurations (without replacement —
    /// the domain is finite), scores each by mean weighted F1 across
    /// stratified folds, refits the winner on the full training set, and
    /// evaluates once on the held-out test set.
    pub fn search(&self, spec: &CandidateSpec, data: &SearchData) -> Result<SearchOutcome> {
        let mut configs = spec.enumerate();
        if configs.is_empty() {
            return Err(RiskmlError::SearchSpaceExhausted(format!(
                "{} domain yields zero configurations",
                spec.name()
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        configs.shuffle(&mut rng);
        configs.truncate(self.config.n_iter.max(1));

        let splits = CrossValidator::new(CvStrategy::StratifiedKFold {
            n_splits: self.config.cv,
        })
        .with_random_state(self.config.seed)
        .split(data.x_train.nrows(), Some(&data.y_train))?;

        // Configurations are independent; evaluate on the rayon pool. The
        // reduction below is deterministic regardless of completion order.
        let scored: Vec<(usize, Option<f64>)> = configs
            .par_iter()
            .enumerate()
            .map(|(idx, params)| (idx, self.cv_score(params, data, &splits)))
            .collect();

        let mut best: Option<(usize, f64)> = None;
        for (idx, score) in scored {
            match score {
                Some(score) => {
                    debug!(family = spec.name(), trial = idx, score, "trial scored");
                    // Strictly-greater keeps the earlier sample on ties
                    if best.map(|(_, b)| score > b).unwrap_or(true) {
                        best = Some((idx, score));
                    }
                }
                None => {
                    debug!(family = spec.name(), trial = idx, "trial failed, skipped");
                }
            }
        }

        let (best_idx, cv_score) = best.ok_or_else(|| {
            RiskmlError::FitFailure(format!(
                "every sampled configuration for {} failed to fit",
                spec.name()
            ))
        })?;
        let best_params = configs.swap_remove(best_idx);

        // Final metrics come from a full-train refit, never a fold fit
        let model = best_params.fit(&data.x_train, &data.y_train, self.config.seed)?;
        let metrics = model.evaluate(&data.x_test, &data.y_test)?;

        Ok(SearchOutcome {
            family: spec.name().to_string(),
            best_params,
            cv_score,
            metrics,
            model,
        })
    }

    /// Mean weighted F1 across folds; `None` if any fold fails to fit.
    fn cv_score(
        &self,
        params: &CandidateParams,
        data: &SearchData,
        splits: &[CvSplit],
    ) -> Option<f64> {
        let mut scores = Vec::with_capacity(splits.len());

        for split in splits {
            let x_fold = data.x_train.select(Axis(0), &split.train_indices);
            let y_fold = select_labels(&data.y_train, &split.train_indices);
            let x_val = data.x_train.select(Axis(0), &split.test_indices);
            let y_val = select_labels(&data.y_train, &split.test_indices);

            let fold_seed = self.config.seed.wrapping_add(split.fold_idx as u64);
            let model = params.fit(&x_fold, &y_fold, fold_seed).ok()?;
            let y_pred = model.predict(&x_val).ok()?;
            scores.push(ClassificationMetrics::compute(&y_val, &y_pred).weighted_f1);
        }

        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

fn select_labels(y: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    Array1::from_vec(indices.iter().map(|&i| y[i]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::registry::LogisticGrid;
    use ndarray::Array2;

    fn search_data() -> SearchData {
        let n = 60;
        let x_train = Array2::from_shape_fn((n, 2), |(i, j)| {
            let base = if i % 2 == 0 { -1.0 } else { 1.0 };
            base + (i as f64 * 0.001) + (j as f64 * 0.01)
        });
        let y_train: Array1<f64> = (0..n).map(|i| (i % 2) as f64).collect();

        let x_test = Array2::from_shape_fn((20, 2), |(i, j)| {
            let base = if i % 2 == 0 { -1.0 } else { 1.0 };
            base + (j as f64 * 0.01)
        });
        let y_test: Array1<f64> = (0..20).map(|i| (i % 2) as f64).collect();

        SearchData { x_train, y_train, x_test, y_test }
    }

    #[test]
    fn test_search_logistic() {
        let engine = ModelSearchEngine::new(SearchConfig {
            cv: 3,
            n_iter: 4,
            seed: 42,
        });
        let spec = CandidateSpec::Logistic(LogisticGrid {
            c: vec![0.1, 1.0],
            max_iter: vec![200, 500],
        });

        let outcome = engine.search(&spec, &search_data()).unwrap();
        assert_eq!(outcome.family, "Logistic Regression");
        assert!(outcome.metrics.accuracy > 0.9);
        assert!(outcome.cv_score > 0.5);
    }

    #[test]
    fn test_empty_domain_is_exhausted() {
        let engine = ModelSearchEngine::default();
        let spec = CandidateSpec::Logistic(LogisticGrid {
            c: vec![],
            max_iter: vec![],
        });

        assert!(matches!(
            engine.search(&spec, &search_data()),
            Err(RiskmlError::SearchSpaceExhausted(_))
        ));
    }

    #[test]
    fn test_all_invalid_configs_is_fit_failure() {
        let engine = ModelSearchEngine::new(SearchConfig {
            cv: 2,
            n_iter: 5,
            seed: 1,
        });
        // Non-positive C makes every configuration fail to fit
        let spec = CandidateSpec::Logistic(LogisticGrid {
            c: vec![0.0, -1.0],
            max_iter: vec![100],
        });

        assert!(matches!(
            engine.search(&spec, &search_data()),
            Err(RiskmlError::FitFailure(_))
        ));
    }

    #[test]
    fn test_partial_failures_are_skipped() {
        let engine = ModelSearchEngine::new(SearchConfig {
            cv: 2,
            n_iter: 10,
            seed: 3,
        });
        // One valid configuration among invalid ones still yields an outcome
        let spec = CandidateSpec::Logistic(LogisticGrid {
            c: vec![0.0, 1.0],
            max_iter: vec![100, 200],
        });

        let outcome = engine.search(&spec, &search_data()).unwrap();
        assert!(matches!(
            outcome.best_params,
            CandidateParams::Logistic { c, .. } if c == 1.0
        ));
    }

    #[test]
    fn test_search_is_deterministic() {
        let data = search_data();
        let config = SearchConfig { cv: 3, n_iter: 3, seed: 11 };
        let spec = CandidateSpec::Logistic(LogisticGrid::default());

        let a = ModelSearchEngine::new(config).search(&spec, &data).unwrap();
        let b = ModelSearchEngine::new(config).search(&spec, &data).unwrap();

        assert_eq!(a.best_params, b.best_params);
        assert_eq!(a.metrics, b.metrics);
    }
}
