//! Error types for the decision-curve library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum DcaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid predictor '{predictor}': {reason}")]
    InvalidPredictorKind { predictor: String, reason: String },

    #[error("Degenerate score for predictor '{0}': rescaling a constant score is undefined")]
    DegenerateScore(String),

    #[error("Invalid time horizon: {0}")]
    InvalidTimeHorizon(String),

    #[error("Prevalence is required for case-control data; it cannot be estimated from the sample")]
    MissingPrevalence,

    #[error("Threshold grid is empty")]
    EmptyThresholdGrid,

    #[error("Length mismatch: expected {expected}, got {actual}")]
    MismatchedLength { expected: usize, actual: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, DcaError>;
