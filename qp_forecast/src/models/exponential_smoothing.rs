//! Exponential smoothing models for throughput forecasting

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};

/// Simple exponential smoothing model
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    /// Name of the model
    name: String,
    /// Smoothing parameter
    alpha: f64,
}

/// Trained exponential smoothing model
#[derive(Debug, Clone)]
pub struct TrainedExponentialSmoothing {
    /// Name of the model
    name: String,
    /// Smoothing parameter
    alpha: f64,
    /// Current level
    level: f64,
}

impl ExponentialSmoothing {
    /// Create a new exponential smoothing model
    pub fn new(alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha > 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Alpha must be in (0, 1]".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Exponential Smoothing (alpha={})", alpha),
            alpha,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl ForecastModel for ExponentialSmoothing {
    type Trained = TrainedExponentialSmoothing;

    fn train(&self, series: &[f64]) -> Result<Self::Trained> {
        let (first, rest) = series.split_first().ok_or_else(|| {
            ForecastError::DataError("Empty time series data".to_string())
        })?;

        let mut level = *first;
        for &value in rest {
            level = self.alpha * value + (1.0 - self.alpha) * level;
        }

        Ok(TrainedExponentialSmoothing {
            name: self.name.clone(),
            alpha: self.alpha,
            level,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedExponentialSmoothing {
    pub fn level(&self) -> f64 {
        self.level
    }
}

impl TrainedForecastModel for TrainedExponentialSmoothing {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        // Flat forecast at the last level
        ForecastResult::new(vec![self.level; horizon], horizon)
    }

    fn predict(&self, series: &[f64]) -> Result<ForecastResult> {
        let (first, _) = series.split_first().ok_or_else(|| {
            ForecastError::DataError("Empty time series data".to_string())
        })?;

        let mut predictions = Vec::with_capacity(series.len());
        let mut current_level = *first;
        predictions.push(current_level);

        for i in 1..series.len() {
            current_level = self.alpha * series[i - 1] + (1.0 - self.alpha) * current_level;
            predictions.push(current_level);
        }

        let len = predictions.len();
        ForecastResult::new(predictions, len)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
