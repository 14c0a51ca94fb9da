#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use polars::prelude::*;
use qp_forecast::{
    ArtifactStore, ForecastError, Forecaster, InMemoryStore, ModelArtifact, ModelForecaster,
    ModelKey, ModelKind, ModelTrainer, RowFilter, TelemetrySchema, TimeSeriesStore, Trainer,
};
use qp_xapp::config::PredictionConfig;
use qp_xapp::{QpConfig, QpContext};
use tempfile::TempDir;

/// (terminal, serving cell, neighbor 0, neighbor 1, downlink, uplink)
pub type Row<'a> = (&'a str, &'a str, &'a str, &'a str, f64, f64);

pub fn telemetry_frame(rows: &[Row]) -> DataFrame {
    DataFrame::new(vec![
        Series::new("ue-id", rows.iter().map(|r| r.0).collect::<Vec<_>>()),
        Series::new("nrCellIdentity", rows.iter().map(|r| r.1).collect::<Vec<_>>()),
        Series::new("nbCellIdentity_0", rows.iter().map(|r| r.2).collect::<Vec<_>>()),
        Series::new("nbCellIdentity_1", rows.iter().map(|r| r.3).collect::<Vec<_>>()),
        Series::new("pdcpBytesDl", rows.iter().map(|r| r.4).collect::<Vec<_>>()),
        Series::new("pdcpBytesUl", rows.iter().map(|r| r.5).collect::<Vec<_>>()),
    ])
    .unwrap()
}

/// ue1 is served by c1 alone; ue2 is served by c2 with neighbors c1 and c3.
/// c3 has no telemetry of its own.
pub fn standard_rows() -> Vec<Row<'static>> {
    let mut rows = Vec::new();
    for i in 0..12 {
        let i = i as f64;
        rows.push(("ue1", "c1", "", "", 100.0 + i, 10.0 + i));
        rows.push(("ue2", "c2", "c1", "c3", 200.0 + i, 20.0));
    }
    rows
}

pub fn standard_store() -> Arc<InMemoryStore> {
    let frame = telemetry_frame(&standard_rows());
    Arc::new(InMemoryStore::from_frame(TelemetrySchema::default(), frame).unwrap())
}

pub fn config(model_dir: &Path, prediction: PredictionConfig) -> QpConfig {
    let mut config = QpConfig::default();
    config.model.dir = model_dir.to_path_buf();
    config.model.min_train_rows = 10;
    config.prediction = prediction;
    config
}

/// A context over `store` with a fresh model directory
pub struct Fixture {
    pub dir: TempDir,
    pub context: QpContext,
}

impl Fixture {
    pub fn new(store: Arc<dyn TimeSeriesStore>, prediction: PredictionConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let context = QpContext::with_store(config(dir.path(), prediction), store).unwrap();
        Self { dir, context }
    }

    pub fn standard() -> Self {
        Self::new(standard_store(), PredictionConfig::default())
    }
}

/// Trainer that counts calls per cell
pub struct CountingTrainer {
    inner: ModelTrainer,
    calls: Mutex<HashMap<String, usize>>,
}

impl CountingTrainer {
    pub fn new(artifacts: ArtifactStore) -> Self {
        Self {
            inner: ModelTrainer::new(artifacts, ModelKind::ExponentialSmoothing, 10).unwrap(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self, cell_id: &str) -> usize {
        self.calls.lock().unwrap().get(cell_id).copied().unwrap_or(0)
    }
}

impl Trainer for CountingTrainer {
    fn train(&self, store: &dyn TimeSeriesStore, cell_id: &str) -> qp_forecast::Result<ModelArtifact> {
        *self.calls.lock().unwrap().entry(cell_id.to_string()).or_default() += 1;
        self.inner.train(store, cell_id)
    }
}

/// Build a context whose trainer counts its calls
pub fn counting_context(
    store: Arc<dyn TimeSeriesStore>,
    dir: &Path,
    prediction: PredictionConfig,
) -> (QpContext, Arc<CountingTrainer>) {
    let artifacts = ArtifactStore::open(dir).unwrap();
    let trainer = Arc::new(CountingTrainer::new(artifacts.clone()));
    let forecaster = Arc::new(ModelForecaster::new(artifacts.clone()));
    let context = QpContext::with_collaborators(
        config(dir, prediction),
        store,
        artifacts,
        trainer.clone(),
        forecaster,
    )
    .unwrap();
    (context, trainer)
}

/// Store whose writes always fail
pub struct FailingWrites(pub Arc<InMemoryStore>);

impl TimeSeriesStore for FailingWrites {
    fn schema(&self) -> &TelemetrySchema {
        self.0.schema()
    }

    fn read(&self, filter: &RowFilter, limit: Option<usize>) -> qp_forecast::Result<Option<DataFrame>> {
        self.0.read(filter, limit)
    }

    fn write(&self, _rows: DataFrame, _cell_id: &str) -> qp_forecast::Result<()> {
        Err(ForecastError::StoreUnavailable("write rejected".to_string()))
    }
}

/// Store that refuses the first `failures` connection attempts
pub struct FlakyStore {
    pub inner: InMemoryStore,
    pub failures: u32,
    pub attempts: AtomicU32,
}

impl FlakyStore {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: InMemoryStore::new(TelemetrySchema::default()),
            failures,
            attempts: AtomicU32::new(0),
        }
    }
}

impl TimeSeriesStore for FlakyStore {
    fn schema(&self) -> &TelemetrySchema {
        self.inner.schema()
    }

    fn connect(&self) -> qp_forecast::Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            Err(ForecastError::StoreUnavailable(format!("attempt {} refused", attempt)))
        } else {
            Ok(())
        }
    }

    fn read(&self, filter: &RowFilter, limit: Option<usize>) -> qp_forecast::Result<Option<DataFrame>> {
        self.inner.read(filter, limit)
    }

    fn write(&self, rows: DataFrame, cell_id: &str) -> qp_forecast::Result<()> {
        self.inner.write(rows, cell_id)
    }
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Forecaster that never produces a sample
pub struct NoForecast;

impl Forecaster for NoForecast {
    fn forecast(
        &self,
        _input: &DataFrame,
        _model: &ModelKey,
        _horizon: usize,
    ) -> qp_forecast::Result<Option<DataFrame>> {
        Ok(None)
    }
}

/// Build a context over `store` with a custom forecaster and a real trainer
pub fn forecaster_context(
    store: Arc<dyn TimeSeriesStore>,
    dir: &Path,
    forecaster: Arc<dyn Forecaster>,
) -> QpContext {
    let artifacts = ArtifactStore::open(dir).unwrap();
    let trainer = Arc::new(ModelTrainer::new(artifacts.clone(), ModelKind::ExponentialSmoothing, 10).unwrap());
    QpContext::with_collaborators(
        config(dir, PredictionConfig::default()),
        store,
        artifacts,
        trainer,
        forecaster,
    )
    .unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScript {
    Pass,
    Empty,
    Fail,
}

impl ReadScript {
    fn apply(
        self,
        read: impl FnOnce() -> qp_forecast::Result<Option<DataFrame>>,
    ) -> qp_forecast::Result<Option<DataFrame>> {
        match self {
            ReadScript::Pass => read(),
            ReadScript::Empty => Ok(None),
            ReadScript::Fail => Err(ForecastError::StoreUnavailable("read rejected".to_string())),
        }
    }
}

/// Store whose topology and window reads can be forced empty or failing.
/// Unbounded cell reads (training history) always pass through.
pub struct ScriptedReads {
    pub inner: Arc<InMemoryStore>,
    pub topology: ReadScript,
    pub window: ReadScript,
    pub topology_delay: Duration,
}

impl ScriptedReads {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            topology: ReadScript::Pass,
            window: ReadScript::Pass,
            topology_delay: Duration::ZERO,
        }
    }
}

impl TimeSeriesStore for ScriptedReads {
    fn schema(&self) -> &TelemetrySchema {
        self.inner.schema()
    }

    fn read(&self, filter: &RowFilter, limit: Option<usize>) -> qp_forecast::Result<Option<DataFrame>> {
        let read = || self.inner.read(filter, limit);
        if filter.terminal_id.is_some() {
            thread::sleep(self.topology_delay);
            self.topology.apply(read)
        } else if limit.is_some() {
            self.window.apply(read)
        } else {
            read()
        }
    }

    fn write(&self, rows: DataFrame, cell_id: &str) -> qp_forecast::Result<()> {
        self.inner.write(rows, cell_id)
    }
}
