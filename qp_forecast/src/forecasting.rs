//! Forecasting collaborator: applies a cell's persisted model to an input window

use crate::artifact::{ArtifactStore, ModelKey};
use crate::data;
use crate::error::{ForecastError, Result};
use polars::prelude::DataFrame;
use tracing::debug;

/// Produces `horizon` forecast rows from an input window
pub trait Forecaster: Send + Sync {
    /// `Ok(None)` when the window holds no usable observations
    fn forecast(
        &self,
        input: &DataFrame,
        model: &ModelKey,
        horizon: usize,
    ) -> Result<Option<DataFrame>>;
}

/// Forecaster backed by artifacts on disk
#[derive(Debug, Clone)]
pub struct ModelForecaster {
    artifacts: ArtifactStore,
}

impl ModelForecaster {
    pub fn new(artifacts: ArtifactStore) -> Self {
        Self { artifacts }
    }
}

impl Forecaster for ModelForecaster {
    fn forecast(
        &self,
        input: &DataFrame,
        model: &ModelKey,
        horizon: usize,
    ) -> Result<Option<DataFrame>> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be positive".to_string(),
            ));
        }

        let artifact = self.artifacts.load(model)?;
        let columns = artifact.column_names();
        data::require_columns(input, &columns)?;

        let mut per_column = Vec::with_capacity(columns.len());
        for column_model in &artifact.columns {
            let series = data::observed_values(input, &column_model.column)?;
            if series.is_empty() {
                debug!(model = %model, column = %column_model.column, "no observations in window");
                return Ok(None);
            }
            per_column.push(column_model.params.forecast(&series, horizon)?);
        }

        let rows: Vec<Vec<f64>> = (0..horizon)
            .map(|step| per_column.iter().map(|f| f.values()[step]).collect())
            .collect();

        Ok(Some(data::frame_from_rows(&columns, &rows)?))
    }
}
