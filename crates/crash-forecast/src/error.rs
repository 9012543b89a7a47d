//! Forecasting error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while fitting, persisting, loading or querying a model.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// Fit failed; any previously persisted model stays usable
    #[error("Model fit failed: {0}")]
    ModelFit(String),

    /// No persisted model at the expected location
    #[error("Model artifact missing or unreadable: {}: {source}", .path.display())]
    ModelMissing {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Persisted artifact is corrupt or cannot forecast
    #[error("Invalid model artifact {}: {reason}", .path.display())]
    InvalidModel { path: PathBuf, reason: String },

    #[error(
        "Invalid forecast horizon {0}: must be between 1 and {max}",
        max = crate::arima::MAX_HORIZON
    )]
    InvalidHorizon(usize),

    #[error("Invalid confidence level {0}: must lie strictly between 0 and 1")]
    InvalidConfidence(f64),

    /// Write failure for the model artifact
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error for {}: {source}", .path.display())]
    Serialization {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Result type for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;
