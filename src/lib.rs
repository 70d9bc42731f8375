//! Riskml - Automated model selection for credit risk classification
//!
//! This crate turns a raw train/test pair of customer records into a
//! persisted best classifier:
//! - Feature transformation: cleaning, label encoding, standardization
//! - Randomized hyperparameter search under cross-validation
//! - Candidate estimators: logistic regression, random forest, MLP
//! - Append-only experiment tracking and artifact persistence
//!
//! # Modules
//!
//! ## Selection flow
//! - [`transform`] - Raw frames to scaled matrices and encoded labels
//! - [`search`] - Candidate registry, CV splitters, randomized search engine
//! - [`pipeline`] - The orchestrator tying the stages together
//!
//! ## Estimators
//! - [`models`] - Candidate families, fitted-model dispatch, metrics
//!
//! ## Infrastructure
//! - [`tracking`] - Append-only experiment run log
//! - [`artifact`] - Serialized model persistence

// Core error handling
pub mod error;

// Selection flow
pub mod transform;
pub mod search;
pub mod pipeline;

// Estimators
pub mod models;

// Infrastructure
pub mod tracking;
pub mod artifact;

pub use error::{Result, RiskmlError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, RiskmlError};

    // Transformation
    pub use crate::transform::{FeatureTransformer, LabelEncoder, StandardScaler, TransformOutput};

    // Estimators and metrics
    pub use crate::models::{ClassificationMetrics, FittedModel};

    // Search
    pub use crate::search::{
        CandidateRegistry, CandidateSpec, ModelSearchEngine, SearchConfig, SearchData,
        SearchOutcome,
    };

    // Tracking and persistence
    pub use crate::artifact::{ArtifactStore, LocalArtifactStore};
    pub use crate::tracking::{ExperimentRun, ExperimentStore, InMemoryStore, JsonlStore, RunKind};

    // Orchestration
    pub use crate::pipeline::{CancelToken, PipelineOrchestrator, PipelineReport};
}
