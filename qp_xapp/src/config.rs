//! Service configuration.
//!
//! Resolution order (highest priority first):
//! 1. Environment variables (`QP_*`)
//! 2. TOML config file
//! 3. Compiled defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use qp_forecast::{ModelKind, TelemetrySchema};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::repair::RepairMode;

/// Top-level configuration aggregating all sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QpConfig {
    pub store: StoreConfig,
    pub schema: TelemetrySchema,
    pub model: ModelConfig,
    pub prediction: PredictionConfig,
    pub repair: RepairConfig,
    pub connection: ConnectionConfig,
}

/// Where telemetry comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// CSV file used to seed the in-memory store
    pub seed_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding per-cell model artifacts
    pub dir: PathBuf,
    pub kind: ModelKind,
    /// Minimum observations per throughput column before a cell can be trained
    pub min_train_rows: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
            kind: ModelKind::ExponentialSmoothing,
            min_train_rows: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Payload field naming the terminals to predict
    pub request_field: String,
    /// Rows of history fed to the forecaster
    pub window: usize,
    pub horizon: usize,
    /// Requests with more terminals than this are processed in chunks
    pub chunk_threshold: usize,
    pub chunk_size: usize,
    /// Worker threads used for chunks; 1 keeps processing on the caller
    pub workers: usize,
    /// Per-request processing budget in milliseconds
    pub deadline_ms: Option<u64>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            request_field: "UEPredictionSet".to_string(),
            window: 101,
            horizon: 1,
            chunk_threshold: 10_000,
            chunk_size: 10_000,
            workers: 1,
            deadline_ms: None,
        }
    }
}

impl PredictionConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RepairConfig {
    pub mode: RepairMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Wait between failed connection attempts
    pub retry_interval_secs: u64,
    /// Give up after this many attempts; retry forever when unset
    pub max_attempts: Option<u32>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            retry_interval_secs: 120,
            max_attempts: None,
        }
    }
}

impl ConnectionConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

impl QpConfig {
    /// Load configuration: defaults, then `path` if given, then environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Apply `QP_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("QP_MODEL_DIR") {
            self.model.dir = PathBuf::from(dir);
        }
        if let Some(csv) = lookup("QP_SEED_CSV") {
            self.store.seed_csv = Some(PathBuf::from(csv));
        }
        if let Some(value) = lookup("QP_CHUNK_SIZE") {
            match value.parse() {
                Ok(size) => self.prediction.chunk_size = size,
                Err(_) => warn!(value = %value, "ignoring non-numeric QP_CHUNK_SIZE"),
            }
        }
        if let Some(value) = lookup("QP_WORKERS") {
            match value.parse() {
                Ok(workers) => self.prediction.workers = workers,
                Err(_) => warn!(value = %value, "ignoring non-numeric QP_WORKERS"),
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("prediction.window", self.prediction.window),
            ("prediction.horizon", self.prediction.horizon),
            ("prediction.chunk_size", self.prediction.chunk_size),
            ("prediction.workers", self.prediction.workers),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::ValidationFailed {
                    field: field.to_string(),
                    message: "must be greater than 0".to_string(),
                });
            }
        }
        if self.schema.throughput_columns.is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "schema.throughput_columns".to_string(),
                message: "at least one column is required".to_string(),
            });
        }
        if self.model.min_train_rows < 2 {
            return Err(ConfigError::ValidationFailed {
                field: "model.min_train_rows".to_string(),
                message: "must be at least 2".to_string(),
            });
        }
        if self.prediction.request_field.is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "prediction.request_field".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
