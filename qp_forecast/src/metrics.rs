//! Metrics for evaluating forecast fit

use crate::error::{ForecastError, Result};
use crate::models::ModelParams;
use serde::{Deserialize, Serialize};

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
}

impl std::fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MAE {:.4}, MSE {:.4}, RMSE {:.4}",
            self.mae, self.mse, self.rmse
        )
    }
}

/// Calculate accuracy metrics for a forecast vs actual values
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastMetrics> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;
    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;

    Ok(ForecastMetrics {
        mae,
        mse,
        rmse: mse.sqrt(),
    })
}

/// Score one-step-ahead predictions of `params` over `series`
///
/// The first observation has no history and is excluded from the score.
pub fn one_step_accuracy(params: &ModelParams, series: &[f64]) -> Result<ForecastMetrics> {
    if series.len() < 2 {
        return Err(ForecastError::ValidationError(
            "Need at least two observations to score a model".to_string(),
        ));
    }
    let predicted = params.predict(series)?;
    forecast_accuracy(&predicted.values()[1..], &series[1..])
}
