//! Time-series store contract and an in-memory implementation
//!
//! The orchestrator and trainer only ever talk to [`TimeSeriesStore`]. The
//! in-memory store keeps telemetry in a single polars frame and is what the
//! service runs against when no external database is wired in.

use crate::data::{self, DataLoader, TelemetrySchema};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::path::Path;
use std::sync::{Mutex, RwLock};

/// Row selection for a read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub terminal_id: Option<String>,
    pub cell_id: Option<String>,
}

impl RowFilter {
    pub fn terminal(id: &str) -> Self {
        Self {
            terminal_id: Some(id.to_string()),
            cell_id: None,
        }
    }

    pub fn cell(id: &str) -> Self {
        Self {
            terminal_id: None,
            cell_id: Some(id.to_string()),
        }
    }
}

/// Read/write contract required by the prediction pipeline
pub trait TimeSeriesStore: Send + Sync {
    /// Column layout of the rows this store returns
    fn schema(&self) -> &TelemetrySchema;

    /// Establish (or re-establish) the connection
    fn connect(&self) -> Result<()> {
        Ok(())
    }

    /// Most recent rows matching `filter`, oldest first; `None` when nothing matches
    fn read(&self, filter: &RowFilter, limit: Option<usize>) -> Result<Option<DataFrame>>;

    /// Append forecast rows tagged with `cell_id`
    fn write(&self, rows: DataFrame, cell_id: &str) -> Result<()>;
}

/// A persisted forecast
#[derive(Debug, Clone)]
pub struct PredictionRecord {
    pub cell_id: String,
    pub written_at: DateTime<Utc>,
    pub rows: DataFrame,
}

/// Telemetry and predictions held in process memory
#[derive(Debug)]
pub struct InMemoryStore {
    schema: TelemetrySchema,
    telemetry: RwLock<DataFrame>,
    predictions: Mutex<Vec<PredictionRecord>>,
}

impl InMemoryStore {
    pub fn new(schema: TelemetrySchema) -> Self {
        Self {
            schema,
            telemetry: RwLock::new(DataFrame::default()),
            predictions: Mutex::new(Vec::new()),
        }
    }

    /// Seed the store with an existing telemetry frame
    pub fn from_frame(schema: TelemetrySchema, df: DataFrame) -> Result<Self> {
        let store = Self::new(schema);
        store.append(df)?;
        Ok(store)
    }

    /// Seed the store from a CSV file of telemetry rows
    pub fn from_csv<P: AsRef<Path>>(schema: TelemetrySchema, path: P) -> Result<Self> {
        let df = DataLoader::from_csv(path, &schema)?;
        Self::from_frame(schema, df)
    }

    /// Append telemetry rows; returns the new row count
    pub fn append(&self, df: DataFrame) -> Result<usize> {
        let df = DataLoader::from_dataframe(df, &self.schema)?;
        let mut telemetry = self
            .telemetry
            .write()
            .map_err(|_| ForecastError::StoreUnavailable("telemetry lock poisoned".to_string()))?;

        if telemetry.width() == 0 {
            *telemetry = df;
        } else {
            telemetry.vstack_mut(&df)?;
        }
        Ok(telemetry.height())
    }

    /// Every prediction written so far, in write order
    pub fn predictions(&self) -> Result<Vec<PredictionRecord>> {
        let predictions = self
            .predictions
            .lock()
            .map_err(|_| ForecastError::StoreUnavailable("prediction lock poisoned".to_string()))?;
        Ok(predictions.clone())
    }

    /// Predictions written for one cell, in write order
    pub fn predictions_for(&self, cell_id: &str) -> Result<Vec<PredictionRecord>> {
        Ok(self
            .predictions()?
            .into_iter()
            .filter(|p| p.cell_id == cell_id)
            .collect())
    }

    fn apply_filter(
        &self,
        df: &DataFrame,
        column: &str,
        wanted: &str,
        mask: &mut [bool],
    ) -> Result<bool> {
        if !df.get_column_names().contains(&column) {
            return Ok(false);
        }
        let values = data::string_values(df, column)?;
        for (keep, value) in mask.iter_mut().zip(values.iter()) {
            *keep = *keep && value.as_deref() == Some(wanted);
        }
        Ok(true)
    }
}

impl TimeSeriesStore for InMemoryStore {
    fn schema(&self) -> &TelemetrySchema {
        &self.schema
    }

    fn read(&self, filter: &RowFilter, limit: Option<usize>) -> Result<Option<DataFrame>> {
        let telemetry = self
            .telemetry
            .read()
            .map_err(|_| ForecastError::StoreUnavailable("telemetry lock poisoned".to_string()))?;

        if telemetry.height() == 0 {
            return Ok(None);
        }

        let mut mask = vec![true; telemetry.height()];
        if let Some(terminal) = &filter.terminal_id {
            if !self.apply_filter(&telemetry, &self.schema.ue_column, terminal, &mut mask)? {
                return Ok(None);
            }
        }
        if let Some(cell) = &filter.cell_id {
            if !self.apply_filter(&telemetry, &self.schema.cell_column, cell, &mut mask)? {
                return Ok(None);
            }
        }

        let selected = telemetry.filter(&BooleanChunked::from_slice("mask", &mask))?;
        let selected = match limit {
            Some(n) => selected.tail(Some(n)),
            None => selected,
        };

        if selected.height() == 0 {
            Ok(None)
        } else {
            Ok(Some(selected))
        }
    }

    fn write(&self, rows: DataFrame, cell_id: &str) -> Result<()> {
        let rows = data::tag_rows(rows, &self.schema.cell_column, cell_id)?;
        let mut predictions = self
            .predictions
            .lock()
            .map_err(|_| ForecastError::StoreUnavailable("prediction lock poisoned".to_string()))?;
        predictions.push(PredictionRecord {
            cell_id: cell_id.to_string(),
            written_at: Utc::now(),
            rows,
        });
        Ok(())
    }
}
