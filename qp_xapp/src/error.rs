//! Error types for the qp_xapp crate

use qp_forecast::ForecastError;
use thiserror::Error;

/// Configuration loading and validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Invalid config value for {field}: {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// Service-level errors
#[derive(Debug, Error)]
pub enum XappError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, XappError>;
