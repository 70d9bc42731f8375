//! Experiment tracking
//!
//! An append-only log of search trials. The store interface is deliberately
//! minimal (`record` + `query_best`) so any persistent log can back it without
//! touching pipeline logic.

mod jsonl;

pub use jsonl::JsonlStore;

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Distinguishes per-candidate trials from the final winner record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Candidate,
    BestModel,
}

/// One immutable experiment record.
///
/// Never mutated or deleted once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRun {
    pub run_id: String,
    pub family: String,
    pub params: BTreeMap<String, String>,
    pub accuracy: f64,
    pub weighted_f1: f64,
    /// Reference into the artifact store, set for persisted models
    pub artifact: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub kind: RunKind,
}

/// Append-only experiment store.
///
/// Appends are atomic with respect to each other; records are never
/// overwritten.
pub trait ExperimentStore: Send + Sync {
    /// Append one run.
    fn record(&self, run: ExperimentRun) -> Result<()>;

    /// The run with the maximum weighted F1, if any. Read-only; ties go to
    /// the earliest-recorded run.
    fn query_best(&self) -> Result<Option<ExperimentRun>>;
}

/// In-process store backed by a mutex-guarded vector
#[derive(Debug, Default)]
pub struct InMemoryStore {
    runs: Mutex<Vec<ExperimentRun>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded runs, in append order.
    pub fn runs(&self) -> Vec<ExperimentRun> {
        self.runs.lock().map(|runs| runs.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.runs.lock().map(|runs| runs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExperimentStore for InMemoryStore {
    fn record(&self, run: ExperimentRun) -> Result<()> {
        let mut runs = self
            .runs
            .lock()
            .map_err(|e| crate::error::RiskmlError::Data(format!("store lock poisoned: {}", e)))?;
        runs.push(run);
        Ok(())
    }

    fn query_best(&self) -> Result<Option<ExperimentRun>> {
        Ok(best_of(&self.runs()))
    }
}

/// Earliest run holding the maximum weighted F1.
pub(crate) fn best_of(runs: &[ExperimentRun]) -> Option<ExperimentRun> {
    let mut best: Option<&ExperimentRun> = None;
    for run in runs {
        let better = match best {
            None => true,
            Some(b) => run.weighted_f1 > b.weighted_f1,
        };
        if better {
            best = Some(run);
        }
    }
    best.cloned()
}
