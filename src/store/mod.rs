//! Run Persistence
//!
//! Saved runs are complete `RunState` snapshots. A loaded run is handed
//! straight back to the reducer, so the store never interprets state.
//!
//! - `memory`: map-backed store for tests and local sessions
//! - `file`: one bincode file per run

mod file;
mod memory;

use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::state::RunState;

pub use file::FileRunStore;
pub use memory::MemoryRunStore;

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No run saved under this id.
    #[error("run {0} not found")]
    NotFound(RunId),

    /// Id is not a valid run id.
    #[error("invalid run id: {0}")]
    InvalidId(String),

    /// Store lock was poisoned.
    #[error("run store lock was poisoned")]
    LockPoisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Store result alias.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Identifier of a saved run (a UUID string).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Parse an id. Only UUIDs are accepted, so ids are always safe file names.
    pub fn parse(s: &str) -> Result<Self> {
        uuid::Uuid::parse_str(s)
            .map(|uuid| Self(uuid.to_string()))
            .map_err(|_| StoreError::InvalidId(s.to_string()))
    }

    /// String form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A run as written to a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRun {
    /// Run id.
    pub id: RunId,
    /// Save time.
    pub saved_at: DateTime<Utc>,
    /// Full snapshot.
    pub state: RunState,
}

impl SavedRun {
    /// Stamp a state with a fresh id and the current time.
    pub fn new(state: RunState) -> Self {
        Self { id: RunId::generate(), saved_at: Utc::now(), state }
    }
}

/// Save/load collaborator for run history.
pub trait RunStore: Send + Sync {
    /// Save a snapshot under a fresh id.
    fn save_run(&self, state: &RunState) -> Result<RunId>;

    /// Load a saved run with its metadata.
    fn load_saved(&self, id: &RunId) -> Result<SavedRun>;

    /// Load a saved snapshot.
    fn load_run(&self, id: &RunId) -> Result<RunState> {
        self.load_saved(id).map(|saved| saved.state)
    }

    /// Ids of every saved run, sorted.
    fn list_runs(&self) -> Result<Vec<RunId>>;

    /// Remove a saved run. Missing runs are not an error.
    fn delete_run(&self, id: &RunId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_parse() {
        let id = RunId::generate();
        assert_eq!(RunId::parse(id.as_str()).unwrap(), id);
        assert!(matches!(RunId::parse("../etc/passwd"), Err(StoreError::InvalidId(_))));
    }
}
