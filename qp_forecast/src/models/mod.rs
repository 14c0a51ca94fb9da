//! Forecasting models for per-cell throughput series

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Forecast result containing predicted values
#[derive(Debug, Clone)]
pub struct ForecastResult {
    /// Forecasted values
    pub(crate) values: Vec<f64>,
    /// Number of periods forecasted
    horizons: usize,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }

        Ok(Self { values, horizons })
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Generate forecast for future periods
    fn forecast(&self, horizons: usize) -> Result<ForecastResult>;

    /// One-step-ahead predictions over a series, one per observation
    fn predict(&self, series: &[f64]) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a univariate series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a series
    fn train(&self, series: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Model family fitted by the trainer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    ExponentialSmoothing,
    MovingAverage,
}

/// Fitted hyperparameters of one column model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelParams {
    ExponentialSmoothing { alpha: f64 },
    MovingAverage { window: usize },
}

impl ModelParams {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelParams::ExponentialSmoothing { .. } => ModelKind::ExponentialSmoothing,
            ModelParams::MovingAverage { .. } => ModelKind::MovingAverage,
        }
    }

    /// Candidate parameters searched when fitting `kind` on `len` observations
    pub fn grid(kind: ModelKind, len: usize) -> Vec<ModelParams> {
        match kind {
            ModelKind::ExponentialSmoothing => (1..=9)
                .map(|step| ModelParams::ExponentialSmoothing {
                    alpha: step as f64 / 10.0,
                })
                .collect(),
            ModelKind::MovingAverage => (1..=len.min(10))
                .map(|window| ModelParams::MovingAverage { window })
                .collect(),
        }
    }

    /// Fit these parameters on `series` and forecast `horizon` steps
    pub fn forecast(&self, series: &[f64], horizon: usize) -> Result<ForecastResult> {
        match *self {
            ModelParams::ExponentialSmoothing { alpha } => {
                ExponentialSmoothing::new(alpha)?.train(series)?.forecast(horizon)
            }
            ModelParams::MovingAverage { window } => {
                // A window shorter than the configured one still gives a usable mean
                let window = window.min(series.len()).max(1);
                SimpleMA::new(window)?.train(series)?.forecast(horizon)
            }
        }
    }

    /// One-step-ahead in-sample predictions for `series`
    pub fn predict(&self, series: &[f64]) -> Result<ForecastResult> {
        match *self {
            ModelParams::ExponentialSmoothing { alpha } => {
                ExponentialSmoothing::new(alpha)?.train(series)?.predict(series)
            }
            ModelParams::MovingAverage { window } => {
                SimpleMA::new(window)?.train(series)?.predict(series)
            }
        }
    }
}

pub mod exponential_smoothing;
pub mod moving_average;

pub use exponential_smoothing::ExponentialSmoothing;
pub use moving_average::SimpleMA;
