//! Error types for the stackfold pipeline

use thiserror::Error;

/// Result type alias for stackfold operations
pub type Result<T> = std::result::Result<T, StackfoldError>;

/// Main error type for the stacking pipeline
#[derive(Error, Debug)]
pub enum StackfoldError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    /// The training rows carry no column matching the target name
    #[error("No {0} column found")]
    MissingTarget(String),

    /// Stratified folds cannot be built from the class counts at hand
    #[error("Cannot build {n_folds} stratified folds: class {class} has {count} samples")]
    DegenerateFolds {
        class: i64,
        count: usize,
        n_folds: usize,
    },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<polars::error::PolarsError> for StackfoldError {
    fn from(err: polars::error::PolarsError) -> Self {
        StackfoldError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for StackfoldError {
    fn from(err: serde_json::Error) -> Self {
        StackfoldError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for StackfoldError {
    fn from(err: ndarray::ShapeError) -> Self {
        StackfoldError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<chrono::ParseError> for StackfoldError {
    fn from(err: chrono::ParseError) -> Self {
        StackfoldError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StackfoldError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_missing_target_display() {
        let err = StackfoldError::MissingTarget("Response".to_string());
        assert_eq!(err.to_string(), "No Response column found");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StackfoldError = io_err.into();
        assert!(matches!(err, StackfoldError::IoError(_)));
    }
}
