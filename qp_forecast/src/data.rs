//! Telemetry frame handling for forecasting
//!
//! Rows in the time-series store are polars `DataFrame`s with one row per
//! measurement timestamp. The helpers here pull identifier and throughput
//! columns out of those frames and build the small frames produced by
//! forecasting.

use crate::error::{ForecastError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Column layout of the telemetry table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySchema {
    /// Column holding the terminal (UE) identifier
    pub ue_column: String,
    /// Column holding the serving cell identifier
    pub cell_column: String,
    /// Prefix shared by every neighbor cell column
    pub neighbor_prefix: String,
    /// Throughput columns, in forecast output order
    pub throughput_columns: Vec<String>,
}

impl Default for TelemetrySchema {
    fn default() -> Self {
        Self {
            ue_column: "ue-id".to_string(),
            cell_column: "nrCellIdentity".to_string(),
            neighbor_prefix: "nbCellIdentity_".to_string(),
            throughput_columns: vec!["pdcpBytesDl".to_string(), "pdcpBytesUl".to_string()],
        }
    }
}

impl TelemetrySchema {
    /// Names of the neighbor columns present in `df`, in frame order
    pub fn neighbor_columns<'a>(&self, df: &'a DataFrame) -> Vec<&'a str> {
        df.get_column_names()
            .into_iter()
            .filter(|name| name.starts_with(&self.neighbor_prefix))
            .collect()
    }

    /// Every identifier column of this schema present in `df`
    fn id_columns(&self, df: &DataFrame) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for name in df.get_column_names() {
            if name == self.ue_column
                || name == self.cell_column
                || name.starts_with(&self.neighbor_prefix)
            {
                columns.push(name.to_string());
            }
        }
        columns
    }
}

/// Serving cell and neighbors of one terminal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellTopology {
    /// Serving cell, if the record carries one
    pub serving: Option<String>,
    /// Neighbor cells in column order
    pub neighbors: Vec<String>,
}

impl CellTopology {
    /// Build the topology from the latest row of a terminal's records
    pub fn from_latest(df: &DataFrame, schema: &TelemetrySchema) -> Result<Self> {
        if df.height() == 0 {
            return Ok(Self::default());
        }
        let last = df.height() - 1;

        let serving = if df.get_column_names().contains(&schema.cell_column.as_str()) {
            string_values(df, &schema.cell_column)?
                .into_iter()
                .nth(last)
                .flatten()
                .filter(|id| !id.is_empty())
        } else {
            None
        };

        let mut neighbors = Vec::new();
        for column in schema.neighbor_columns(df) {
            if let Some(id) = string_values(df, column)?.into_iter().nth(last).flatten() {
                if !id.is_empty() {
                    neighbors.push(id);
                }
            }
        }

        Ok(Self { serving, neighbors })
    }

    /// Cells in presentation order: serving first, then neighbors
    pub fn cells(&self) -> Vec<String> {
        self.serving
            .iter()
            .cloned()
            .chain(self.neighbors.iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.serving.is_none() && self.neighbors.is_empty()
    }
}

/// Data loader for telemetry tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a telemetry table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, schema: &TelemetrySchema) -> Result<DataFrame> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(df, schema)
    }

    /// Normalize an existing frame so identifier columns are strings
    pub fn from_dataframe(mut df: DataFrame, schema: &TelemetrySchema) -> Result<DataFrame> {
        for name in schema.id_columns(&df) {
            let column = df.column(&name)?;
            if column.dtype() != &DataType::Utf8 {
                let casted = column.cast(&DataType::Utf8)?;
                df.with_column(casted)?;
            }
        }
        Ok(df)
    }
}

/// Fail with the list of `columns` absent from `df`
pub fn require_columns(df: &DataFrame, columns: &[String]) -> Result<()> {
    let present = df.get_column_names();
    let missing: Vec<String> = columns
        .iter()
        .filter(|c| !present.contains(&c.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ForecastError::MissingColumns(missing))
    }
}

/// Restrict `df` to the throughput columns, in the given order
pub fn select_columns(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    require_columns(df, columns)?;
    Ok(df.select(columns.iter())?)
}

/// Column values as f64, nulls preserved
pub fn column_as_f64(df: &DataFrame, column_name: &str) -> Result<Vec<Option<f64>>> {
    let col = df.column(column_name).map_err(|_| {
        ForecastError::MissingColumns(vec![column_name.to_string()])
    })?;

    match col.dtype() {
        DataType::Float64 => Ok(col.f64()?.into_iter().collect()),
        dtype if dtype.is_numeric() => {
            let casted = col.cast(&DataType::Float64)?;
            let values = casted.f64()?.into_iter().collect();
            Ok(values)
        }
        _ => Err(ForecastError::DataError(format!(
            "Column '{}' cannot be converted to f64",
            column_name
        ))),
    }
}

/// Non-null column values as f64
pub fn observed_values(df: &DataFrame, column_name: &str) -> Result<Vec<f64>> {
    Ok(column_as_f64(df, column_name)?.into_iter().flatten().collect())
}

/// Column values as strings, nulls preserved
pub fn string_values(df: &DataFrame, column_name: &str) -> Result<Vec<Option<String>>> {
    let col = df.column(column_name).map_err(|_| {
        ForecastError::MissingColumns(vec![column_name.to_string()])
    })?;
    let casted = match col.dtype() {
        DataType::Utf8 => col.clone(),
        _ => col.cast(&DataType::Utf8)?,
    };
    let values = casted
        .utf8()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

/// Build a frame with one column per name from row-major values
pub fn frame_from_rows(columns: &[String], rows: &[Vec<f64>]) -> Result<DataFrame> {
    let mut series = Vec::with_capacity(columns.len());
    for (idx, name) in columns.iter().enumerate() {
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let value = row.get(idx).copied().ok_or_else(|| {
                ForecastError::ValidationError(format!(
                    "Row has {} values, expected {}",
                    row.len(),
                    columns.len()
                ))
            })?;
            values.push(value);
        }
        series.push(Series::new(name, values));
    }
    Ok(DataFrame::new(series)?)
}

/// Values of the first row for the given columns
pub fn first_row(df: &DataFrame, columns: &[String]) -> Result<Vec<Option<f64>>> {
    if df.height() == 0 {
        return Err(ForecastError::DataError("Frame has no rows".to_string()));
    }
    let mut row = Vec::with_capacity(columns.len());
    for name in columns {
        row.push(column_as_f64(df, name)?.first().copied().flatten());
    }
    Ok(row)
}

/// Add (or replace) a constant string column tagging every row
pub fn tag_rows(mut df: DataFrame, column: &str, value: &str) -> Result<DataFrame> {
    let tag = Series::new(column, vec![value.to_string(); df.height()]);
    df.with_column(tag)?;
    Ok(df)
}
