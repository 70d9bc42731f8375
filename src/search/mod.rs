//! Model search: candidate registry, cross-validation, and the randomized
//! hyperparameter search engine

pub mod cross_validation;
pub mod engine;
pub mod registry;

pub use cross_validation::{CrossValidator, CvSplit, CvStrategy};
pub use engine::{ModelSearchEngine, SearchConfig, SearchData, SearchOutcome};
pub use registry::{
    CandidateParams, CandidateRegistry, CandidateSpec, ForestGrid, LogisticGrid, MlpGrid,
};
