//! Error types for the riskml pipeline

use thiserror::Error;

/// Result type alias for riskml operations
pub type Result<T> = std::result::Result<T, RiskmlError>;

/// Main error type for the riskml pipeline
#[derive(Error, Debug)]
pub enum RiskmlError {
    /// Feature transformation failed (missing label column, non-numeric
    /// features, empty training set after cleaning).
    #[error("Transformation error: {0}")]
    Transformation(String),

    /// A candidate's hyperparameter domain yielded zero valid configurations.
    #[error("Search space exhausted: {0}")]
    SearchSpaceExhausted(String),

    /// Every sampled configuration for a candidate failed to fit.
    #[error("Fit failure: {0}")]
    FitFailure(String),

    /// Every registered candidate failed; no model can be selected.
    #[error("No viable model: every candidate search failed")]
    NoViableModel,

    /// Writing the winning model artifact failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The pipeline run was cancelled between candidates.
    #[error("Pipeline run aborted")]
    Aborted,

    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<polars::error::PolarsError> for RiskmlError {
    fn from(err: polars::error::PolarsError) -> Self {
        RiskmlError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for RiskmlError {
    fn from(err: serde_json::Error) -> Self {
        RiskmlError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for RiskmlError {
    fn from(err: ndarray::ShapeError) -> Self {
        RiskmlError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RiskmlError::Transformation("label column missing".to_string());
        assert_eq!(err.to_string(), "Transformation error: label column missing");
    }

    #[test]
    fn test_no_viable_model_display() {
        assert_eq!(
            RiskmlError::NoViableModel.to_string(),
            "No viable model: every candidate search failed"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RiskmlError = io_err.into();
        assert!(matches!(err, RiskmlError::Io(_)));
    }
}
