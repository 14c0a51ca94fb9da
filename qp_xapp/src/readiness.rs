//! Model readiness gate.
//!
//! Each cell is either untrained or trained. The state lives in a registry
//! keyed by [`ModelKey`], seeded from the artifact directory at start-up; the
//! artifact file itself stays the source of truth, so a model removed on disk
//! is trained again on next use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use qp_forecast::{ArtifactStore, ForecastError, ModelKey, TimeSeriesStore, Trainer};
use tracing::{debug, info, warn};

use crate::locks::{acquire, KeyedLocks};

/// Training state of one cell model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Untrained,
    Trained,
}

/// Train-on-demand gate over the artifact directory.
///
/// The state registry and the training locks keep one entry per distinct cell
/// id ever asked about, including cells that failed to train. Ids come from
/// stored topology, so the growth is bounded by the cells in the store.
pub struct ReadinessGate {
    artifacts: ArtifactStore,
    trainer: Arc<dyn Trainer>,
    states: Mutex<HashMap<ModelKey, ModelState>>,
    training_locks: KeyedLocks<ModelKey>,
}

impl std::fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessGate")
            .field("artifacts", &self.artifacts)
            .finish_non_exhaustive()
    }
}

impl ReadinessGate {
    /// Build the gate, indexing artifacts already on disk
    pub fn new(artifacts: ArtifactStore, trainer: Arc<dyn Trainer>) -> qp_forecast::Result<Self> {
        let states: HashMap<ModelKey, ModelState> = artifacts
            .keys()?
            .into_iter()
            .map(|key| (key, ModelState::Trained))
            .collect();
        debug!(models = states.len(), dir = %artifacts.dir().display(), "indexed model artifacts");

        Ok(Self {
            artifacts,
            trainer,
            states: Mutex::new(states),
            training_locks: KeyedLocks::new(),
        })
    }

    /// Current state of the model for `cell_id`
    pub fn state(&self, cell_id: &str) -> ModelState {
        match ModelKey::from_cell_id(cell_id) {
            Ok(key) => self.key_state(&key),
            Err(_) => ModelState::Untrained,
        }
    }

    pub fn key_state(&self, key: &ModelKey) -> ModelState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(ModelState::Untrained)
    }

    fn set_state(&self, key: &ModelKey, state: ModelState) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), state);
    }

    /// Make sure a model exists for `cell_id`, training one if needed
    pub fn ensure_ready(
        &self,
        cell_id: &str,
        store: &dyn TimeSeriesStore,
    ) -> qp_forecast::Result<ModelKey> {
        let key = ModelKey::from_cell_id(cell_id)?;
        self.ensure_key_ready(&key, cell_id, store)?;
        Ok(key)
    }

    /// As [`ensure_ready`](Self::ensure_ready) for an already derived key
    pub fn ensure_key_ready(
        &self,
        key: &ModelKey,
        cell_id: &str,
        store: &dyn TimeSeriesStore,
    ) -> qp_forecast::Result<()> {
        if self.key_state(key) == ModelState::Trained && self.artifacts.contains(key) {
            return Ok(());
        }

        let lock = self.training_locks.lock_for(key);
        let _guard = acquire(&lock);

        // Another caller may have finished training while we waited
        if self.artifacts.contains(key) {
            self.set_state(key, ModelState::Trained);
            return Ok(());
        }
        self.set_state(key, ModelState::Untrained);

        info!(cell_id, model = %key, "no model artifact, training");
        self.trainer.train(store, cell_id)?;

        if !self.artifacts.contains(key) {
            warn!(cell_id, model = %key, "trainer returned without persisting an artifact");
            return Err(ForecastError::ArtifactNotFound(key.to_string()));
        }
        self.set_state(key, ModelState::Trained);
        Ok(())
    }

    /// Drop the model for `cell_id` so the next use retrains it
    pub fn invalidate(&self, cell_id: &str) -> qp_forecast::Result<bool> {
        let key = ModelKey::from_cell_id(cell_id)?;
        let lock = self.training_locks.lock_for(&key);
        let _guard = acquire(&lock);

        let removed = self.artifacts.remove(&key)?;
        self.set_state(&key, ModelState::Untrained);
        Ok(removed)
    }
}
