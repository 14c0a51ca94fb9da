//! Prediction orchestrator.
//!
//! Turns a list of terminal ids into a [`PredictionResult`]: topology lookup,
//! readiness gate, window read, forecast, persistence. Every per-terminal and
//! per-cell failure is absorbed into the result; nothing here fails a request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use qp_forecast::{
    data, CellTopology, ForecastError, Forecaster, ModelKey, RowFilter, TimeSeriesStore,
};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, warn};

use crate::config::PredictionConfig;
use crate::error::{Result, XappError};
use crate::locks::{acquire, KeyedLocks};
use crate::readiness::ReadinessGate;
use crate::result::{CellForecast, CellMap, NullReason, PredictionResult};

pub struct Orchestrator {
    store: Arc<dyn TimeSeriesStore>,
    gate: ReadinessGate,
    forecaster: Arc<dyn Forecaster>,
    settings: PredictionConfig,
    cell_locks: KeyedLocks<String>,
    pool: Option<ThreadPool>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("gate", &self.gate)
            .field("settings", &self.settings)
            .field("workers", &self.pool.as_ref().map(ThreadPool::current_num_threads))
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn TimeSeriesStore>,
        gate: ReadinessGate,
        forecaster: Arc<dyn Forecaster>,
        settings: PredictionConfig,
    ) -> Result<Self> {
        let pool = if settings.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(settings.workers)
                .thread_name(|i| format!("qp-predict-{}", i))
                .build()
                .map_err(|e| XappError::WorkerPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            store,
            gate,
            forecaster,
            settings,
            cell_locks: KeyedLocks::new(),
            pool,
        })
    }

    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    pub fn settings(&self) -> &PredictionConfig {
        &self.settings
    }

    /// Predict every terminal, chunking large requests
    pub fn predict_all(&self, terminal_ids: &[String]) -> PredictionResult {
        let deadline = self.settings.deadline().map(|budget| Instant::now() + budget);

        let chunk_size = if terminal_ids.len() > self.settings.chunk_threshold {
            self.settings.chunk_size
        } else {
            terminal_ids.len()
        };
        let chunk_size = match &self.pool {
            // Split so every worker gets a share
            Some(pool) => chunk_size.min(terminal_ids.len().div_ceil(pool.current_num_threads())),
            None => chunk_size,
        };

        let result = self.run_chunks(terminal_ids, chunk_size, deadline);
        if result.is_truncated() {
            warn!(
                requested = terminal_ids.len(),
                completed = result.len(),
                "prediction deadline exceeded, returning partial result"
            );
        }
        result
    }

    /// Predict in chunks of `chunk_size` terminals; output matches [`predict_all`](Self::predict_all)
    pub fn predict_chunked(&self, terminal_ids: &[String], chunk_size: usize) -> PredictionResult {
        let deadline = self.settings.deadline().map(|budget| Instant::now() + budget);
        self.run_chunks(terminal_ids, chunk_size, deadline)
    }

    fn run_chunks(
        &self,
        terminal_ids: &[String],
        chunk_size: usize,
        deadline: Option<Instant>,
    ) -> PredictionResult {
        if terminal_ids.is_empty() {
            return PredictionResult::new();
        }
        let chunks: Vec<&[String]> = terminal_ids.chunks(chunk_size.max(1)).collect();
        debug!(terminals = terminal_ids.len(), chunks = chunks.len(), "processing prediction request");

        let stop = AtomicBool::new(false);
        let outputs: Vec<PredictionResult> = match &self.pool {
            Some(pool) if chunks.len() > 1 => pool.install(|| {
                chunks
                    .par_iter()
                    .map(|chunk| self.process_chunk(chunk, deadline, &stop))
                    .collect()
            }),
            _ => chunks
                .iter()
                .map(|chunk| self.process_chunk(chunk, deadline, &stop))
                .collect(),
        };

        // A truncated result is always a prefix of the request
        let mut merged = PredictionResult::new();
        for output in outputs {
            let truncated = output.is_truncated();
            merged.merge(output);
            if truncated {
                break;
            }
        }
        merged
    }

    /// Process one chunk of terminals in order, stopping at the deadline or
    /// once another chunk has hit it
    fn process_chunk(
        &self,
        chunk: &[String],
        deadline: Option<Instant>,
        stop: &AtomicBool,
    ) -> PredictionResult {
        let mut output = PredictionResult::new();
        for terminal_id in chunk {
            if stop.load(Ordering::Relaxed) || deadline.is_some_and(|d| Instant::now() >= d) {
                stop.store(true, Ordering::Relaxed);
                output.mark_truncated();
                break;
            }
            let cells = self.predict_terminal(terminal_id);
            output.insert(terminal_id.clone(), cells);
        }
        output
    }

    /// Forecast every cell around one terminal
    pub fn predict_terminal(&self, terminal_id: &str) -> CellMap {
        let mut cells = CellMap::new();
        for cell_id in self.topology(terminal_id).cells() {
            let forecast = self.predict_cell(&cell_id);
            cells.insert(cell_id, forecast);
        }
        cells
    }

    /// Serving and neighbor cells from the terminal's latest record
    pub fn topology(&self, terminal_id: &str) -> CellTopology {
        let latest = match self.store.read(&RowFilter::terminal(terminal_id), Some(1)) {
            Ok(Some(latest)) => latest,
            Ok(None) => {
                debug!(terminal_id, "no stored record for terminal");
                return CellTopology::default();
            }
            Err(e) => {
                warn!(terminal_id, error = %e, "topology read failed");
                return CellTopology::default();
            }
        };

        CellTopology::from_latest(&latest, self.store.schema()).unwrap_or_else(|e| {
            warn!(terminal_id, error = %e, "unreadable topology record");
            CellTopology::default()
        })
    }

    /// Forecast one cell; gate, read, forecast and write run under the cell's lock
    pub fn predict_cell(&self, cell_id: &str) -> CellForecast {
        let lock = self.cell_locks.lock_for(&cell_id.to_string());
        let _guard = acquire(&lock);

        let key = match ModelKey::from_cell_id(cell_id) {
            Ok(key) => key,
            Err(e) => {
                warn!(cell_id, error = %e, "skipping cell");
                return CellForecast::Null(NullReason::InvalidCellId);
            }
        };

        if let Err(e) = self.gate.ensure_key_ready(&key, cell_id, self.store.as_ref()) {
            warn!(cell_id, error = %e, "model training failed");
            return CellForecast::Null(NullReason::TrainingFailed);
        }

        let schema = self.store.schema();
        let window = match self
            .store
            .read(&RowFilter::cell(cell_id), Some(self.settings.window))
        {
            Ok(Some(window)) => window,
            Ok(None) => {
                debug!(cell_id, "no telemetry for cell");
                return CellForecast::Null(NullReason::NoData);
            }
            Err(e) => {
                warn!(cell_id, error = %e, "cell window read failed");
                return CellForecast::Null(NullReason::ReadFailed);
            }
        };

        let input = match data::select_columns(&window, &schema.throughput_columns) {
            Ok(input) => input,
            Err(ForecastError::MissingColumns(missing)) => {
                debug!(cell_id, ?missing, "UL/DL parameters do not exist in provided data");
                return CellForecast::Null(NullReason::MissingColumns);
            }
            Err(e) => {
                warn!(cell_id, error = %e, "cell window unusable");
                return CellForecast::Null(NullReason::ReadFailed);
            }
        };

        let forecast = match self.forecaster.forecast(&input, &key, self.settings.horizon) {
            Ok(Some(forecast)) => forecast,
            Ok(None) => return CellForecast::Null(NullReason::NoForecast),
            Err(e) => {
                warn!(cell_id, error = %e, "forecast failed");
                return CellForecast::Null(NullReason::ForecastFailed);
            }
        };

        let sample: Option<Vec<f64>> = match data::first_row(&forecast, &schema.throughput_columns) {
            Ok(row) => row.into_iter().collect(),
            Err(e) => {
                debug!(cell_id, error = %e, "forecast has no usable first row");
                None
            }
        };
        let Some(sample) = sample else {
            return CellForecast::Null(NullReason::NoForecast);
        };

        let written = data::tag_rows(forecast, &schema.cell_column, cell_id)
            .and_then(|tagged| self.store.write(tagged, cell_id));
        if let Err(e) = written {
            warn!(cell_id, error = %e, "failed to persist forecast");
            return CellForecast::Null(NullReason::WriteFailed);
        }

        CellForecast::Sample(sample)
    }
}
