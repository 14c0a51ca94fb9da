//! Persisted per-cell model artifacts
//!
//! An artifact is a JSON document named after the cell's [`ModelKey`]. Its
//! presence on disk marks the cell as trained.

use crate::error::{ForecastError, Result};
use crate::metrics::ForecastMetrics;
use crate::models::{ModelKind, ModelParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const ARTIFACT_EXTENSION: &str = "json";

/// Filesystem-safe name derived from a cell identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelKey(String);

impl ModelKey {
    /// Strip path separators from `cell_id`
    pub fn from_cell_id(cell_id: &str) -> Result<Self> {
        let key: String = cell_id.chars().filter(|c| *c != '/' && *c != '\\').collect();
        if key.trim().is_empty() {
            return Err(ForecastError::InvalidParameter(format!(
                "Cell id '{}' has no usable characters for a model name",
                cell_id
            )));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fitted model for one throughput column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnModel {
    pub column: String,
    pub params: ModelParams,
    pub fit: ForecastMetrics,
}

/// Trained model for one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub cell_id: String,
    pub kind: ModelKind,
    pub columns: Vec<ColumnModel>,
    pub training_rows: usize,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    /// Names of the columns this model forecasts, in output order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.column.clone()).collect()
    }
}

/// Directory of model artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) an artifact directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &ModelKey) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.as_str(), ARTIFACT_EXTENSION))
    }

    pub fn contains(&self, key: &ModelKey) -> bool {
        self.path_for(key).is_file()
    }

    pub fn load(&self, key: &ModelKey) -> Result<ModelArtifact> {
        let raw = match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ForecastError::ArtifactNotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the artifact through a temporary file and rename it into place,
    /// so a reader never observes a half-written model.
    pub fn save(&self, key: &ModelKey, artifact: &ModelArtifact) -> Result<PathBuf> {
        let target = self.path_for(key);
        let tmp = self.dir.join(format!("{}.{}.tmp", key.as_str(), ARTIFACT_EXTENSION));

        let body = serde_json::to_vec_pretty(artifact)?;
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(target)
    }

    /// Remove an artifact; returns whether one existed
    pub fn remove(&self, key: &ModelKey) -> Result<bool> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Keys of every artifact currently on disk
    pub fn keys(&self) -> Result<Vec<ModelKey>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(ModelKey(stem.to_string()));
            }
        }
        keys.sort();
        Ok(keys)
    }
}
