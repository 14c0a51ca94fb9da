//! Error types for the qp_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the qp_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to forecasting operations
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Required throughput columns are not present in a frame
    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// No persisted model exists for the given key
    #[error("No model artifact for '{0}'")]
    ArtifactNotFound(String),

    /// The time-series store could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from JSON (de)serialization of artifacts
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
