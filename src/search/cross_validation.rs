//! Cross-validation splitters

use crate::error::{Result, RiskmlError};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A single train/validation fold over sample indices
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Fold strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvStrategy {
    /// Plain k-fold over shuffled indices
    KFold { n_splits: usize },
    /// K-fold preserving per-class proportions across folds
    StratifiedKFold { n_splits: usize },
}

/// Seeded cross-validation splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CvStrategy,
    random_state: Option<u64>,
}

impl CrossValidator {
    pub fn new(strategy: CvStrategy) -> Self {
        Self { strategy, random_state: None }
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Generate train/validation splits.
    ///
    /// `y` is required for the stratified strategy.
    pub fn split(&self, n_samples: usize, y: Option<&Array1<f64>>) -> Result<Vec<CvSplit>> {
        match self.strategy {
            CvStrategy::KFold { n_splits } => self.k_fold_split(n_samples, n_splits),
            CvStrategy::StratifiedKFold { n_splits } => {
                let y = y.ok_or_else(|| {
                    RiskmlError::Data("stratified k-fold requires a target array".to_string())
                })?;
                self.stratified_split(y, n_splits)
            }
        }
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    fn k_fold_split(&self, n_samples: usize, n_splits: usize) -> Result<Vec<CvSplit>> {
        validate_splits(n_samples, n_splits)?;

        let mut indices: Vec<usize> = (0..n_samples).collect();
        indices.shuffle(&mut self.rng());

        // Earlier folds absorb the remainder, one extra sample each
        let fold_sizes: Vec<usize> = (0..n_splits)
            .map(|i| {
                let base = n_samples / n_splits;
                if i < n_samples % n_splits { base + 1 } else { base }
            })
            .collect();

        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;
        for (fold_idx, &fold_size) in fold_sizes.iter().enumerate() {
            let test_indices: Vec<usize> = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CvSplit { train_indices, test_indices, fold_idx });
            current += fold_size;
        }

        Ok(splits)
    }

    fn stratified_split(&self, y: &Array1<f64>, n_splits: usize) -> Result<Vec<CvSplit>> {
        validate_splits(y.len(), n_splits)?;

        // Group sample indices by class, ordered for determinism
        let mut class_indices: std::collections::BTreeMap<i64, Vec<usize>> =
            std::collections::BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        let mut rng = self.rng();
        for indices in class_indices.values_mut() {
            indices.shuffle(&mut rng);
        }

        // Round-robin each class across folds
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        for indices in class_indices.values() {
            for (i, &idx) in indices.iter().enumerate() {
                folds[i % n_splits].push(idx);
            }
        }

        let splits = (0..n_splits)
            .map(|fold_idx| {
                let test_indices = folds[fold_idx].clone();
                let train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                CvSplit { train_indices, test_indices, fold_idx }
            })
            .collect();

        Ok(splits)
    }
}

fn validate_splits(n_samples: usize, n_splits: usize) -> Result<()> {
    if n_splits < 2 {
        return Err(RiskmlError::Data(
            "n_splits must be at least 2".to_string(),
        ));
    }
    if n_samples < n_splits {
        return Err(RiskmlError::Data(format!(
            "n_samples ({}) must be >= n_splits ({})",
            n_samples, n_splits
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_fold_covers_all_indices() {
        let cv = CrossValidator::new(CvStrategy::KFold { n_splits: 5 }).with_random_state(42);
        let splits = cv.split(100, None).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            assert_eq!(split.train_indices.len(), 80);
        }

        let mut all_test: Vec<usize> = splits
            .iter()
            .flat_map(|s| s.test_indices.clone())
            .collect();
        all_test.sort_unstable();
        assert_eq!(all_test, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_stratified_preserves_class_balance() {
        let y: Array1<f64> = (0..10).map(|i| if i < 5 { 0.0 } else { 1.0 }).collect();

        let cv = CrossValidator::new(CvStrategy::StratifiedKFold { n_splits: 5 })
            .with_random_state(42);
        let splits = cv.split(10, Some(&y)).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 2);
            let classes: Vec<i64> = split
                .test_indices
                .iter()
                .map(|&i| y[i].round() as i64)
                .collect();
            assert!(classes.contains(&0) && classes.contains(&1));
        }
    }

    #[test]
    fn test_seeded_splits_are_reproducible() {
        let cv_a = CrossValidator::new(CvStrategy::KFold { n_splits: 3 }).with_random_state(7);
        let cv_b = CrossValidator::new(CvStrategy::KFold { n_splits: 3 }).with_random_state(7);

        let a = cv_a.split(30, None).unwrap();
        let b = cv_b.split(30, None).unwrap();
        for (sa, sb) in a.iter().zip(b.iter()) {
            assert_eq!(sa.test_indices, sb.test_indices);
        }
    }

    #[test]
    fn test_too_few_samples_is_error() {
        let cv = CrossValidator::new(CvStrategy::KFold { n_splits: 5 });
        assert!(cv.split(3, None).is_err());
    }

    #[test]
    fn test_stratified_requires_target() {
        let cv = CrossValidator::new(CvStrategy::StratifiedKFold { n_splits: 2 });
        assert!(cv.split(10, None).is_err());
    }
}
