//! # QP Forecast
//!
//! Per-cell throughput forecasting for the QoE predictor.
//!
//! ## Features
//!
//! - Telemetry frames backed by polars (`TelemetrySchema`, `CellTopology`)
//! - The time-series store contract (`TimeSeriesStore`) plus an in-memory store
//! - Forecasting models (Exponential Smoothing, Simple Moving Average)
//! - Persisted per-cell model artifacts addressed by a filesystem-safe key
//! - A grid-search trainer and an artifact-backed forecaster
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qp_forecast::{
//!     ArtifactStore, Forecaster, InMemoryStore, ModelForecaster, ModelKey, ModelKind,
//!     ModelTrainer, RowFilter, TelemetrySchema, TimeSeriesStore, Trainer,
//! };
//!
//! # fn main() -> qp_forecast::Result<()> {
//! let store = InMemoryStore::from_csv(TelemetrySchema::default(), "cells.csv")?;
//! let artifacts = ArtifactStore::open("models")?;
//!
//! let trainer = ModelTrainer::new(artifacts.clone(), ModelKind::ExponentialSmoothing, 10)?;
//! trainer.train(&store, "c1/B13")?;
//!
//! let window = store.read(&RowFilter::cell("c1/B13"), Some(101))?.unwrap_or_default();
//! let forecaster = ModelForecaster::new(artifacts);
//! let _next = forecaster.forecast(&window, &ModelKey::from_cell_id("c1/B13")?, 1)?;
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod data;
pub mod error;
pub mod forecasting;
pub mod metrics;
pub mod models;
pub mod store;
pub mod training;

// Re-export commonly used types
pub use crate::artifact::{ArtifactStore, ColumnModel, ModelArtifact, ModelKey};
pub use crate::data::{CellTopology, DataLoader, TelemetrySchema};
pub use crate::error::{ForecastError, Result};
pub use crate::forecasting::{Forecaster, ModelForecaster};
pub use crate::metrics::ForecastMetrics;
pub use crate::models::{ForecastModel, ForecastResult, ModelKind, ModelParams};
pub use crate::store::{InMemoryStore, PredictionRecord, RowFilter, TimeSeriesStore};
pub use crate::training::{ModelTrainer, Trainer};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
