//! Service context and message loop.
//!
//! [`QpContext`] owns everything a running predictor needs: the store handle,
//! the orchestrator, the request counters and the dispatcher. Nothing is
//! global; tests build as many contexts as they like.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use qp_forecast::{
    ArtifactStore, Forecaster, InMemoryStore, ModelForecaster, ModelTrainer, TimeSeriesStore,
    Trainer,
};
use tracing::{info, warn};

use crate::config::QpConfig;
use crate::connection::connect_with_backoff;
use crate::dispatch::{Dispatcher, MessageSink};
use crate::error::Result;
use crate::handler::{InboundMessage, PredictionHandler, RequestStats, StatsSnapshot, PREDICTION_REQUEST};
use crate::orchestrator::Orchestrator;
use crate::readiness::ReadinessGate;

pub struct QpContext {
    config: QpConfig,
    store: Arc<dyn TimeSeriesStore>,
    orchestrator: Arc<Orchestrator>,
    stats: Arc<RequestStats>,
    dispatcher: Dispatcher,
    running: AtomicBool,
}

impl std::fmt::Debug for QpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QpContext")
            .field("config", &self.config)
            .field("orchestrator", &self.orchestrator)
            .field("stats", &self.stats)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl QpContext {
    /// Build a context over an in-memory store, seeded from `store.seed_csv` when set
    pub fn from_config(config: QpConfig) -> Result<Self> {
        let store = match &config.store.seed_csv {
            Some(path) => {
                info!(path = %path.display(), "seeding in-memory store");
                InMemoryStore::from_csv(config.schema.clone(), path)?
            }
            None => InMemoryStore::new(config.schema.clone()),
        };
        Self::with_store(config, Arc::new(store))
    }

    /// Build a context over `store` with the artifact-backed collaborators
    pub fn with_store(config: QpConfig, store: Arc<dyn TimeSeriesStore>) -> Result<Self> {
        let artifacts = ArtifactStore::open(&config.model.dir)?;
        let trainer = ModelTrainer::new(
            artifacts.clone(),
            config.model.kind,
            config.model.min_train_rows,
        )?;
        let forecaster = ModelForecaster::new(artifacts.clone());
        Self::with_collaborators(config, store, artifacts, Arc::new(trainer), Arc::new(forecaster))
    }

    /// Build a context from explicit collaborators
    pub fn with_collaborators(
        config: QpConfig,
        store: Arc<dyn TimeSeriesStore>,
        artifacts: ArtifactStore,
        trainer: Arc<dyn Trainer>,
        forecaster: Arc<dyn Forecaster>,
    ) -> Result<Self> {
        let gate = ReadinessGate::new(artifacts, trainer)?;
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&store),
            gate,
            forecaster,
            config.prediction.clone(),
        )?);
        let stats = Arc::new(RequestStats::new());

        let handler = PredictionHandler::new(
            Arc::clone(&orchestrator),
            config.repair.mode,
            Arc::clone(&stats),
        );
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(PREDICTION_REQUEST, Arc::new(handler));

        Ok(Self {
            config,
            store,
            orchestrator,
            stats,
            dispatcher,
            running: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &QpConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TimeSeriesStore> {
        &self.store
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Connect the store, retrying per `[connection]`
    pub fn connect(&self) -> Result<u32> {
        Ok(connect_with_backoff(self.store.as_ref(), &self.config.connection)?)
    }

    /// Dispatch one message, replying through `sink`
    pub fn handle(&self, message: &InboundMessage, sink: &dyn MessageSink) -> bool {
        self.dispatcher.dispatch(message, sink)
    }

    /// Dispatch messages from `source` until it ends or [`stop`](Self::stop) is called.
    /// Returns the number of messages consumed.
    pub fn run<I>(&self, source: I, sink: &dyn MessageSink) -> usize
    where
        I: IntoIterator<Item = InboundMessage>,
    {
        self.running.store(true, Ordering::SeqCst);
        info!("prediction service started");

        let mut consumed = 0;
        for message in source {
            if !self.is_running() {
                warn!("stop requested, leaving message loop");
                break;
            }
            self.dispatcher.dispatch(&message, sink);
            consumed += 1;
        }

        self.running.store(false, Ordering::SeqCst);
        info!(consumed, stats = ?self.stats(), "prediction service stopped");
        consumed
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
