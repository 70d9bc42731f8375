//! Model artifact persistence
//!
//! Fitted models are serialized to JSON documents under a base directory.
//! The returned reference is the path of the written file; experiment records
//! carry it so a run can be traced back to its artifact.

use crate::error::{Result, RiskmlError};
use crate::models::FittedModel;
use std::path::{Path, PathBuf};
use tracing::info;

/// Destination for serialized fitted models
pub trait ArtifactStore: Send + Sync {
    /// Persist `model` under `name` and return a reference to the stored
    /// artifact.
    fn save(&self, name: &str, model: &FittedModel) -> Result<String>;

    /// Load a previously saved model by the reference `save` returned.
    fn load(&self, reference: &str) -> Result<FittedModel>;
}

/// Filesystem-backed artifact store
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    base_dir: PathBuf,
}

impl LocalArtifactStore {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self { base_dir: base_dir.as_ref().to_path_buf() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn save(&self, name: &str, model: &FittedModel) -> Result<String> {
        std::fs::create_dir_all(&self.base_dir).map_err(|e| {
            RiskmlError::Persistence(format!("create {:?}: {}", self.base_dir, e))
        })?;

        let path = self.base_dir.join(format!("{}.json", name));
        let json = serde_json::to_string_pretty(model)
            .map_err(|e| RiskmlError::Persistence(format!("serialize model: {}", e)))?;
        std::fs::write(&path, json)
            .map_err(|e| RiskmlError::Persistence(format!("write {:?}: {}", path, e)))?;

        info!(artifact = ?path, "model artifact saved");
        Ok(path.to_string_lossy().into_owned())
    }

    fn load(&self, reference: &str) -> Result<FittedModel> {
        let contents = std::fs::read_to_string(reference)
            .map_err(|e| RiskmlError::Persistence(format!("read {}: {}", reference, e)))?;
        let model: FittedModel = serde_json::from_str(&contents)
            .map_err(|e| RiskmlError::Persistence(format!("corrupt artifact: {}", e)))?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogisticRegression;
    use ndarray::{array, Array1, Array2};

    fn fitted_model() -> FittedModel {
        let x: Array2<f64> =
            array![[-1.0, -1.0], [-0.9, -1.1], [1.0, 1.0], [1.1, 0.9]];
        let y: Array1<f64> = array![0.0, 0.0, 1.0, 1.0];
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        FittedModel::Logistic(model)
    }

    fn temp_store(name: &str) -> LocalArtifactStore {
        let dir = std::env::temp_dir()
            .join(format!("riskml-artifacts-{}-{}", name, std::process::id()));
        LocalArtifactStore::new(dir)
    }

    #[test]
    fn test_save_and_load() {
        let store = temp_store("save-load");
        let model = fitted_model();

        let reference = store.save("best-model-0001", &model).unwrap();
        assert!(reference.ends_with("best-model-0001.json"));

        let loaded = store.load(&reference).unwrap();
        let x: Array2<f64> = array![[-1.0, -1.0], [1.0, 1.0]];
        assert_eq!(loaded.predict(&x).unwrap(), model.predict(&x).unwrap());

        let _ = std::fs::remove_dir_all(store.base_dir());
    }

    #[test]
    fn test_load_missing_is_persistence_error() {
        let store = temp_store("missing");
        assert!(matches!(
            store.load("/nonexistent/riskml/model.json"),
            Err(RiskmlError::Persistence(_))
        ));
    }
}
