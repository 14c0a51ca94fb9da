//! Moving average model for throughput forecasting

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};

/// Simple Moving Average model
#[derive(Debug, Clone)]
pub struct SimpleMA {
    /// Name of the model
    name: String,
    /// Window size
    window: usize,
}

/// Trained Simple Moving Average model
#[derive(Debug, Clone)]
pub struct TrainedSimpleMA {
    /// Name of the model
    name: String,
    /// Window size
    window: usize,
    /// Last calculated average
    last_average: f64,
}

impl SimpleMA {
    /// Create a new Simple Moving Average model
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Simple Moving Average (window={})", window),
            window,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl ForecastModel for SimpleMA {
    type Trained = TrainedSimpleMA;

    fn train(&self, series: &[f64]) -> Result<Self::Trained> {
        if series.len() < self.window {
            return Err(ForecastError::ValidationError(format!(
                "Insufficient data for SMA. Need at least {} observations.",
                self.window
            )));
        }

        let last_average =
            series[series.len() - self.window..].iter().sum::<f64>() / self.window as f64;

        Ok(TrainedSimpleMA {
            name: self.name.clone(),
            window: self.window,
            last_average,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedSimpleMA {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ForecastResult::new(vec![self.last_average; horizon], horizon)
    }

    fn predict(&self, series: &[f64]) -> Result<ForecastResult> {
        if series.is_empty() {
            return Err(ForecastError::DataError(
                "Empty time series data".to_string(),
            ));
        }

        // Prediction for step i averages up to `window` observations before it;
        // the first step has no history and echoes the observation.
        let mut predictions = Vec::with_capacity(series.len());
        predictions.push(series[0]);
        for i in 1..series.len() {
            let start = i.saturating_sub(self.window);
            let history = &series[start..i];
            predictions.push(history.iter().sum::<f64>() / history.len() as f64);
        }

        let len = predictions.len();
        ForecastResult::new(predictions, len)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
