//! Observation archive
//!
//! Successful predictions are appended here and listed back by the blooms
//! endpoint. The file store keeps one JSON object per line.

use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{Observation, ObservationFilter};

/// Observation store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Observation store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode observation: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only observation storage
pub trait ObservationStore: Send + Sync {
    fn insert(&self, observation: &Observation) -> Result<(), StoreError>;

    /// Observations matching `filter`, sorted by date ascending
    fn query(&self, filter: &ObservationFilter) -> Result<Vec<Observation>, StoreError>;
}

fn sort_by_date(observations: &mut [Observation]) {
    observations.sort_by(|a, b| a.date.cmp(&b.date));
}

/// JSON-lines file store
pub struct JsonlObservationStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlObservationStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ObservationStore for JsonlObservationStore {
    fn insert(&self, observation: &Observation) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(observation)?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn query(&self, filter: &ObservationFilter) -> Result<Vec<Observation>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut results = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Observation>(line) {
                Ok(obs) if filter.matches(&obs) => results.push(obs),
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    "Skipping unreadable observation at {}:{}: {}",
                    self.path.display(),
                    line_no + 1,
                    e
                ),
            }
        }

        sort_by_date(&mut results);
        Ok(results)
    }
}

/// In-memory store, used by tests and the offline CLI
#[derive(Default)]
pub struct MemoryObservationStore {
    observations: Mutex<Vec<Observation>>,
}

impl MemoryObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.observations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.lock().is_empty()
    }
}

impl ObservationStore for MemoryObservationStore {
    fn insert(&self, observation: &Observation) -> Result<(), StoreError> {
        self.observations.lock().push(observation.clone());
        Ok(())
    }

    fn query(&self, filter: &ObservationFilter) -> Result<Vec<Observation>, StoreError> {
        let mut results: Vec<Observation> = self
            .observations
            .lock()
            .iter()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        sort_by_date(&mut results);
        Ok(results)
    }
}
