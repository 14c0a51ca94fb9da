//! Prediction result types.
//!
//! Results are ordered maps: terminals in request order, cells in topology
//! order. Re-inserting an existing key replaces its value in place, which is
//! how a JSON object built from the same sequence of assignments behaves.

use std::collections::HashMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Why a cell has no forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullReason {
    /// No telemetry rows for the cell
    NoData,
    /// Rows exist but lack the throughput columns
    MissingColumns,
    /// The forecaster produced nothing usable
    NoForecast,
    /// The forecaster failed
    ForecastFailed,
    /// Training a model for the cell failed
    TrainingFailed,
    /// Reading the cell's window failed
    ReadFailed,
    /// Persisting the forecast failed
    WriteFailed,
    /// The cell id yields no usable model name
    InvalidCellId,
}

/// Forecast outcome for one cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellForecast {
    /// One value per throughput column
    Sample(Vec<f64>),
    /// Serialized as `[null, null]`
    Null(NullReason),
}

impl CellForecast {
    pub fn is_null(&self) -> bool {
        matches!(self, CellForecast::Null(_))
    }

    pub fn sample(&self) -> Option<&[f64]> {
        match self {
            CellForecast::Sample(values) => Some(values),
            CellForecast::Null(_) => None,
        }
    }
}

impl Serialize for CellForecast {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellForecast::Sample(values) => values.serialize(serializer),
            CellForecast::Null(_) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&None::<f64>)?;
                seq.serialize_element(&None::<f64>)?;
                seq.end()
            }
        }
    }
}

/// Cell id -> forecast, in topology order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellMap {
    entries: Vec<(String, CellForecast)>,
}

impl CellMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cell_id: String, forecast: CellForecast) {
        match self.entries.iter_mut().find(|(id, _)| *id == cell_id) {
            Some((_, existing)) => *existing = forecast,
            None => self.entries.push((cell_id, forecast)),
        }
    }

    pub fn get(&self, cell_id: &str) -> Option<&CellForecast> {
        self.entries
            .iter()
            .find(|(id, _)| id == cell_id)
            .map(|(_, forecast)| forecast)
    }

    pub fn cell_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellForecast)> {
        self.entries.iter().map(|(id, f)| (id.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CellMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (cell_id, forecast) in &self.entries {
            map.serialize_entry(cell_id, forecast)?;
        }
        map.end()
    }
}

/// Terminal id -> cell forecasts, in request order
#[derive(Debug, Clone, Default)]
pub struct PredictionResult {
    entries: Vec<(String, CellMap)>,
    index: HashMap<String, usize>,
    truncated: bool,
}

impl PartialEq for PredictionResult {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries && self.truncated == other.truncated
    }
}

impl PredictionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, terminal_id: String, cells: CellMap) {
        match self.index.get(&terminal_id) {
            Some(&pos) => self.entries[pos].1 = cells,
            None => {
                self.index.insert(terminal_id.clone(), self.entries.len());
                self.entries.push((terminal_id, cells));
            }
        }
    }

    /// Fold a later chunk's output into this one
    pub fn merge(&mut self, other: PredictionResult) {
        self.truncated |= other.truncated;
        for (terminal_id, cells) in other.entries {
            self.insert(terminal_id, cells);
        }
    }

    pub fn get(&self, terminal_id: &str) -> Option<&CellMap> {
        self.index.get(terminal_id).map(|&pos| &self.entries[pos].1)
    }

    pub fn terminal_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellMap)> {
        self.entries.iter().map(|(id, cells)| (id.as_str(), cells))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether processing stopped at the deadline before every terminal ran
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub(crate) fn mark_truncated(&mut self) {
        self.truncated = true;
    }
}

impl Serialize for PredictionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (terminal_id, cells) in &self.entries {
            map.serialize_entry(terminal_id, cells)?;
        }
        map.end()
    }
}
