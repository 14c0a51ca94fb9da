//! Training collaborator: fits and persists a model for one cell

use crate::artifact::{ArtifactStore, ColumnModel, ModelArtifact, ModelKey};
use crate::data;
use crate::error::{ForecastError, Result};
use crate::metrics::{one_step_accuracy, ForecastMetrics};
use crate::models::{ModelKind, ModelParams};
use crate::store::{RowFilter, TimeSeriesStore};
use chrono::Utc;
use tracing::{debug, info};

/// Produces and persists a [`ModelArtifact`] for a cell
pub trait Trainer: Send + Sync {
    fn train(&self, store: &dyn TimeSeriesStore, cell_id: &str) -> Result<ModelArtifact>;
}

/// Grid-search trainer over one model family
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    artifacts: ArtifactStore,
    kind: ModelKind,
    min_rows: usize,
}

impl ModelTrainer {
    pub fn new(artifacts: ArtifactStore, kind: ModelKind, min_rows: usize) -> Result<Self> {
        if min_rows < 2 {
            return Err(ForecastError::InvalidParameter(
                "Training needs at least 2 rows per column".to_string(),
            ));
        }
        Ok(Self {
            artifacts,
            kind,
            min_rows,
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Pick the grid point with the lowest one-step-ahead RMSE
    fn fit_column(&self, column: &str, series: &[f64]) -> Result<ColumnModel> {
        let mut best: Option<(ModelParams, ForecastMetrics)> = None;
        for params in ModelParams::grid(self.kind, series.len()) {
            let fit = one_step_accuracy(&params, series)?;
            let better = match &best {
                Some((_, current)) => fit.rmse < current.rmse,
                None => true,
            };
            if better {
                best = Some((params, fit));
            }
        }

        let (params, fit) = best.ok_or_else(|| {
            ForecastError::ForecastingError(format!("No candidate model for column '{}'", column))
        })?;
        debug!(column, ?params, rmse = fit.rmse, "selected column model");

        Ok(ColumnModel {
            column: column.to_string(),
            params,
            fit,
        })
    }
}

impl Trainer for ModelTrainer {
    fn train(&self, store: &dyn TimeSeriesStore, cell_id: &str) -> Result<ModelArtifact> {
        let key = ModelKey::from_cell_id(cell_id)?;
        let columns = store.schema().throughput_columns.clone();

        let history = store
            .read(&RowFilter::cell(cell_id), None)?
            .ok_or_else(|| {
                ForecastError::DataError(format!("No telemetry stored for cell '{}'", cell_id))
            })?;
        data::require_columns(&history, &columns)?;

        let mut fitted = Vec::with_capacity(columns.len());
        for column in &columns {
            let series = data::observed_values(&history, column)?;
            if series.len() < self.min_rows {
                return Err(ForecastError::DataError(format!(
                    "Cell '{}' has {} observations of '{}', need {}",
                    cell_id,
                    series.len(),
                    column,
                    self.min_rows
                )));
            }
            fitted.push(self.fit_column(column, &series)?);
        }

        let artifact = ModelArtifact {
            cell_id: cell_id.to_string(),
            kind: self.kind,
            columns: fitted,
            training_rows: history.height(),
            trained_at: Utc::now(),
        };
        let path = self.artifacts.save(&key, &artifact)?;
        info!(cell_id, path = %path.display(), rows = artifact.training_rows, "trained cell model");

        Ok(artifact)
    }
}
