//! Pipeline orchestration
//!
//! One `run` drives the full selection flow: transform the raw splits, search
//! each registered candidate family in order, track every trial, pick the
//! winner on held-out weighted F1, persist its artifact, and record the
//! best-model run.

use crate::artifact::ArtifactStore;
use crate::error::{Result, RiskmlError};
use crate::models::ClassificationMetrics;
use crate::search::{
    CandidateRegistry, ModelSearchEngine, SearchConfig, SearchData, SearchOutcome,
};
use crate::tracking::{ExperimentRun, ExperimentStore, RunKind};
use crate::transform::FeatureTransformer;
use chrono::Utc;
use polars::prelude::DataFrame;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Cooperative cancellation flag, checked between pipeline stages
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Final report of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Held-out test metrics per candidate family that completed its search.
    /// A family registered more than once keeps its best entry, so the
    /// winner's family always maps to the winner's metrics.
    pub results: BTreeMap<String, ClassificationMetrics>,
    /// Family name of the selected model
    pub best_model_name: String,
    /// Reference to the persisted winner artifact
    pub artifact_ref: String,
    /// Hyperparameters of the selected configuration
    pub best_params: BTreeMap<String, String>,
}

impl PipelineReport {
    /// Held-out metrics of the selected model.
    pub fn best_metrics(&self) -> Option<&ClassificationMetrics> {
        self.results.get(&self.best_model_name)
    }
}

/// Drives transformation, per-family search, tracking, selection, and
/// persistence for one train/test pair.
#[derive(Debug, Clone)]
pub struct PipelineOrchestrator {
    transformer: FeatureTransformer,
    registry: CandidateRegistry,
    config: SearchConfig,
}

impl Default for PipelineOrchestrator {
    fn default() -> Self {
        Self::new(
            FeatureTransformer::default(),
            CandidateRegistry::default_families(),
            SearchConfig::default(),
        )
    }
}

impl PipelineOrchestrator {
    pub fn new(
        transformer: FeatureTransformer,
        registry: CandidateRegistry,
        config: SearchConfig,
    ) -> Self {
        Self { transformer, registry, config }
    }

    /// Run the full selection pipeline.
    pub fn run(
        &self,
        train: &DataFrame,
        test: &DataFrame,
        tracker: &dyn ExperimentStore,
        artifacts: &dyn ArtifactStore,
    ) -> Result<PipelineReport> {
        self.run_with_cancel(train, test, tracker, artifacts, &CancelToken::new())
    }

    /// Run the pipeline, aborting between stages when `cancel` fires.
    ///
    /// An aborted run records nothing further and persists no artifact;
    /// candidate runs already appended stay in the log.
    pub fn run_with_cancel(
        &self,
        train: &DataFrame,
        test: &DataFrame,
        tracker: &dyn ExperimentStore,
        artifacts: &dyn ArtifactStore,
        cancel: &CancelToken,
    ) -> Result<PipelineReport> {
        // Transformation failures are fatal: no usable matrices, no search
        let transformed = self.transformer.transform(train, test)?;
        info!(
            train_rows = transformed.x_train.nrows(),
            test_rows = transformed.x_test.nrows(),
            features = transformed.feature_names.len(),
            "features transformed"
        );

        let data = SearchData {
            x_train: transformed.x_train,
            y_train: transformed.y_train,
            x_test: transformed.x_test,
            y_test: transformed.y_test,
        };
        let engine = ModelSearchEngine::new(self.config);

        let mut seq: usize = 0;
        let mut results: BTreeMap<String, ClassificationMetrics> = BTreeMap::new();
        // Best-so-far in registry order; strictly-greater keeps the earlier
        // family on exact weighted F1 ties
        let mut best: Option<SearchOutcome> = None;

        for spec in self.registry.iter() {
            if cancel.is_cancelled() {
                warn!("pipeline cancelled before {} search", spec.name());
                return Err(RiskmlError::Aborted);
            }

            info!(family = spec.name(), "candidate search started");
            let outcome = match engine.search(spec, &data) {
                Ok(outcome) => outcome,
                Err(e) => {
                    // One family failing does not end the run
                    warn!(family = spec.name(), error = %e, "candidate search failed, skipped");
                    continue;
                }
            };

            seq += 1;
            tracker.record(ExperimentRun {
                run_id: format!("{}-{:04}", spec.slug(), seq),
                family: outcome.family.clone(),
                params: outcome.best_params.to_map(),
                accuracy: outcome.metrics.accuracy,
                weighted_f1: outcome.metrics.weighted_f1,
                artifact: None,
                timestamp: Utc::now(),
                kind: RunKind::Candidate,
            })?;

            info!(
                family = outcome.family.as_str(),
                accuracy = outcome.metrics.accuracy,
                weighted_f1 = outcome.metrics.weighted_f1,
                cv_score = outcome.cv_score,
                "candidate search finished"
            );

            // Per-family best; strictly-greater keeps the earlier entry on
            // ties, matching the winner accumulator below
            results
                .entry(outcome.family.clone())
                .and_modify(|m| {
                    if outcome.metrics.weighted_f1 > m.weighted_f1 {
                        *m = outcome.metrics;
                    }
                })
                .or_insert(outcome.metrics);
            let better = match &best {
                None => true,
                Some(b) => outcome.metrics.weighted_f1 > b.metrics.weighted_f1,
            };
            if better {
                best = Some(outcome);
            }
        }

        let best = best.ok_or(RiskmlError::NoViableModel)?;

        if cancel.is_cancelled() {
            warn!("pipeline cancelled before winner persistence");
            return Err(RiskmlError::Aborted);
        }

        // Persistence failures are fatal: a winner nobody can load is no
        // selection at all
        seq += 1;
        let best_id = format!("best-model-{:04}", seq);
        let artifact_ref = artifacts.save(&best_id, &best.model)?;

        tracker.record(ExperimentRun {
            run_id: best_id,
            family: best.family.clone(),
            params: best.best_params.to_map(),
            accuracy: best.metrics.accuracy,
            weighted_f1: best.metrics.weighted_f1,
            artifact: Some(artifact_ref.clone()),
            timestamp: Utc::now(),
            kind: RunKind::BestModel,
        })?;

        info!(
            family = best.family.as_str(),
            weighted_f1 = best.metrics.weighted_f1,
            artifact = artifact_ref.as_str(),
            "best model selected"
        );

        Ok(PipelineReport {
            results,
            best_model_name: best.family,
            artifact_ref,
            best_params: best.best_params.to_map(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::LocalArtifactStore;
    use crate::search::{CandidateSpec, LogisticGrid};
    use crate::tracking::InMemoryStore;
    use polars::prelude::*;

    fn frame(n: usize, offset: usize) -> DataFrame {
        let ids: Vec<i64> = (0..n).map(|i| (offset + i) as i64).collect();
        let scores: Vec<f64> = (0..n)
            .map(|i| if i % 2 == 0 { 580.0 + i as f64 } else { 720.0 + i as f64 })
            .collect();
        let util: Vec<f64> = (0..n)
            .map(|i| if i % 2 == 0 { 0.9 - 0.001 * i as f64 } else { 0.1 + 0.001 * i as f64 })
            .collect();
        let labels: Vec<&str> = (0..n)
            .map(|i| if i % 2 == 0 { "High Risk" } else { "Low Risk" })
            .collect();

        df!(
            "Customer ID" => ids,
            "Credit Score" => scores,
            "Utilization" => util,
            "Risk Classification" => labels
        )
        .unwrap()
    }

    fn logistic_only() -> CandidateRegistry {
        CandidateRegistry::new(vec![CandidateSpec::Logistic(LogisticGrid {
            c: vec![0.1, 1.0],
            max_iter: vec![200],
        })])
    }

    fn artifacts(name: &str) -> LocalArtifactStore {
        LocalArtifactStore::new(
            std::env::temp_dir().join(format!("riskml-pipeline-{}-{}", name, std::process::id())),
        )
    }

    #[test]
    fn test_single_family_run() {
        let orchestrator = PipelineOrchestrator::new(
            FeatureTransformer::default(),
            logistic_only(),
            SearchConfig { cv: 3, n_iter: 2, seed: 42 },
        );
        let tracker = InMemoryStore::new();
        let store = artifacts("single");

        let report = orchestrator
            .run(&frame(60, 0), &frame(20, 100), &tracker, &store)
            .unwrap();

        assert_eq!(report.best_model_name, "Logistic Regression");
        assert_eq!(report.results.len(), 1);
        assert!(report.best_metrics().unwrap().accuracy > 0.9);

        // One candidate run plus one best-model run
        let runs = tracker.runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].kind, RunKind::Candidate);
        assert_eq!(runs[0].run_id, "logistic-regression-0001");
        assert!(runs[0].artifact.is_none());
        assert_eq!(runs[1].kind, RunKind::BestModel);
        assert_eq!(runs[1].run_id, "best-model-0002");
        assert_eq!(runs[1].artifact.as_deref(), Some(report.artifact_ref.as_str()));

        let _ = std::fs::remove_dir_all(store.base_dir());
    }

    #[test]
    fn test_failed_family_is_skipped() {
        // First family cannot fit (non-positive C), second wins
        let registry = CandidateRegistry::new(vec![
            CandidateSpec::Logistic(LogisticGrid { c: vec![-1.0], max_iter: vec![100] }),
            CandidateSpec::Logistic(LogisticGrid { c: vec![1.0], max_iter: vec![200] }),
        ]);
        let orchestrator = PipelineOrchestrator::new(
            FeatureTransformer::default(),
            registry,
            SearchConfig { cv: 2, n_iter: 2, seed: 42 },
        );
        let tracker = InMemoryStore::new();
        let store = artifacts("skip");

        let report = orchestrator
            .run(&frame(40, 0), &frame(10, 100), &tracker, &store)
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(tracker.len(), 2);

        let _ = std::fs::remove_dir_all(store.base_dir());
    }

    #[test]
    fn test_all_families_failed_is_no_viable_model() {
        let registry = CandidateRegistry::new(vec![CandidateSpec::Logistic(LogisticGrid {
            c: vec![-1.0],
            max_iter: vec![100],
        })]);
        let orchestrator = PipelineOrchestrator::new(
            FeatureTransformer::default(),
            registry,
            SearchConfig { cv: 2, n_iter: 1, seed: 42 },
        );
        let tracker = InMemoryStore::new();
        let store = artifacts("none");

        let err = orchestrator
            .run(&frame(40, 0), &frame(10, 100), &tracker, &store)
            .unwrap_err();
        assert!(matches!(err, RiskmlError::NoViableModel));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_transform_failure_records_nothing() {
        let test = frame(10, 100).drop("Risk Classification").unwrap();
        let orchestrator = PipelineOrchestrator::new(
            FeatureTransformer::default(),
            logistic_only(),
            SearchConfig::default(),
        );
        let tracker = InMemoryStore::new();
        let store = artifacts("transform-fail");

        let err = orchestrator
            .run(&frame(40, 0), &test, &tracker, &store)
            .unwrap_err();
        assert!(matches!(err, RiskmlError::Transformation(_)));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_pre_cancelled_run_aborts() {
        let orchestrator = PipelineOrchestrator::new(
            FeatureTransformer::default(),
            logistic_only(),
            SearchConfig { cv: 2, n_iter: 1, seed: 42 },
        );
        let tracker = InMemoryStore::new();
        let store = artifacts("cancel");
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = orchestrator
            .run_with_cancel(&frame(40, 0), &frame(10, 100), &tracker, &store, &cancel)
            .unwrap_err();
        assert!(matches!(err, RiskmlError::Aborted));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_duplicate_family_reports_winning_metrics() {
        // Same family twice: the winner fits, the duplicate never updates its
        // zero-initialized weights and predicts one class everywhere. The
        // report must keep the winning entry, not the last one.
        let registry = CandidateRegistry::new(vec![
            CandidateSpec::Logistic(LogisticGrid { c: vec![1.0], max_iter: vec![200] }),
            CandidateSpec::Logistic(LogisticGrid { c: vec![1.0], max_iter: vec![0] }),
        ]);
        let orchestrator = PipelineOrchestrator::new(
            FeatureTransformer::default(),
            registry,
            SearchConfig { cv: 2, n_iter: 1, seed: 42 },
        );
        let tracker = InMemoryStore::new();
        let store = artifacts("dup-family");

        let report = orchestrator
            .run(&frame(40, 0), &frame(10, 100), &tracker, &store)
            .unwrap();

        assert_eq!(report.results.len(), 1);
        let best = tracker.query_best().unwrap().unwrap();
        assert_eq!(report.best_metrics().unwrap().weighted_f1, best.weighted_f1);
        assert!(report.best_metrics().unwrap().weighted_f1 > 0.9);

        let _ = std::fs::remove_dir_all(store.base_dir());
    }

    #[test]
    fn test_tie_break_keeps_registry_order() {
        // Cleanly separable data gives both configurations perfect held-out
        // metrics; the earlier-registered candidate must win the tie
        let registry = CandidateRegistry::new(vec![
            CandidateSpec::Logistic(LogisticGrid { c: vec![1.0], max_iter: vec![200] }),
            CandidateSpec::Logistic(LogisticGrid { c: vec![10.0], max_iter: vec![200] }),
        ]);
        let orchestrator = PipelineOrchestrator::new(
            FeatureTransformer::default(),
            registry,
            SearchConfig { cv: 2, n_iter: 1, seed: 42 },
        );
        let tracker = InMemoryStore::new();
        let store = artifacts("tie");

        let report = orchestrator
            .run(&frame(40, 0), &frame(10, 100), &tracker, &store)
            .unwrap();

        let runs = tracker.runs();
        assert_eq!(runs[0].weighted_f1, runs[1].weighted_f1);

        let best = runs.iter().find(|r| r.kind == RunKind::BestModel).unwrap();
        // The persisted winner carries the first-recorded candidate's
        // configuration, not the later one's
        assert_eq!(best.params, runs[0].params);
        assert_eq!(best.params["C"], "1");
        assert_eq!(report.best_model_name, "Logistic Regression");

        let _ = std::fs::remove_dir_all(store.base_dir());
    }
}
