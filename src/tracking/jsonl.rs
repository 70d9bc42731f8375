//! File-backed experiment store: one JSON document per line, append-only

use super::{best_of, ExperimentRun, ExperimentStore};
use crate::error::{Result, RiskmlError};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Experiment log on disk.
///
/// Each `record` appends a single serialized line under a mutex, so
/// concurrent appends never interleave. `query_best` re-reads the log; the
/// file itself is the source of truth.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    /// Open (or create) a log at `path`, creating parent directories.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RiskmlError::Persistence(format!("create {:?}: {}", parent, e)))?;
        }
        Ok(Self { path, write_lock: Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All runs currently in the log, in append order.
    pub fn runs(&self) -> Result<Vec<ExperimentRun>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| RiskmlError::Persistence(format!("read {:?}: {}", self.path, e)))?;

        let mut runs = Vec::new();
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            let run: ExperimentRun = serde_json::from_str(line)
                .map_err(|e| RiskmlError::Persistence(format!("corrupt run record: {}", e)))?;
            runs.push(run);
        }
        Ok(runs)
    }
}

impl ExperimentStore for JsonlStore {
    fn record(&self, run: ExperimentRun) -> Result<()> {
        // Line and newline go out in one write so appends from another
        // process cannot interleave mid-record
        let mut line = serde_json::to_string(&run)
            .map_err(|e| RiskmlError::Persistence(format!("serialize run: {}", e)))?;
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| RiskmlError::Persistence(format!("store lock poisoned: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RiskmlError::Persistence(format!("open {:?}: {}", self.path, e)))?;
        file.write_all(line.as_bytes())
            .map_err(|e| RiskmlError::Persistence(format!("append {:?}: {}", self.path, e)))?;

        debug!(run_id = %run.run_id, path = ?self.path, "run recorded");
        Ok(())
    }

    fn query_best(&self) -> Result<Option<ExperimentRun>> {
        Ok(best_of(&self.runs()?))
    }
}
