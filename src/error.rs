//! Error types for the exoplanet classification core

use thiserror::Error;

/// Result type alias for classification operations
pub type Result<T> = std::result::Result<T, ExoError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum ExoError {
    /// The table could not be matched to any mission signature and no hint was given
    #[error("Unknown mission: {0}")]
    UnknownMission(String),

    /// Preprocessing left no usable rows
    #[error("Data exhausted: {0}")]
    DataExhausted(String),

    /// No classifier handle is registered for the requested mission
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Required signature columns are missing (diagnostic, never blocks inference)
    #[error("Schema mismatch for {mission}: missing {missing:?}")]
    SchemaMismatch { mission: String, missing: Vec<String> },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Explanation error: {0}")]
    ExplanationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for ExoError {
    fn from(err: polars::error::PolarsError) -> Self {
        ExoError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ExoError {
    fn from(err: serde_json::Error) -> Self {
        ExoError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for ExoError {
    fn from(err: bincode::Error) -> Self {
        ExoError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ExoError {
    fn from(err: ndarray::ShapeError) -> Self {
        ExoError::ShapeError {
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
        let err = ExoError::DataExhausted("no rows remain".to_string());
        assert_eq!(err.to_string(), "Data exhausted: no rows remain");
    }

    #[test]
    fn test_schema_mismatch_display() {
        let err = ExoError::SchemaMismatch {
            mission: "k2".to_string(),
            missing: vec!["sy_dist".to_string()],
        };
        assert!(err.to_string().contains("sy_dist"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ExoError = io_err.into();
        assert!(matches!(err, ExoError::IoError(_)));
    }
}
