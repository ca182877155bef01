//! In-memory RunStore for tests and local sessions.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::game::state::RunState;
use crate::store::{Result, RunId, RunStore, SavedRun, StoreError};

/// Map-backed run store.
#[derive(Default)]
pub struct MemoryRunStore {
    runs: RwLock<BTreeMap<RunId, SavedRun>>,
}

impl MemoryRunStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunStore for MemoryRunStore {
    fn save_run(&self, state: &RunState) -> Result<RunId> {
        let saved = SavedRun::new(state.clone());
        let id = saved.id.clone();
        let mut runs = self.runs.write().map_err(|_| StoreError::LockPoisoned)?;
        runs.insert(id.clone(), saved);
        Ok(id)
    }

    fn load_saved(&self, id: &RunId) -> Result<SavedRun> {
        let runs = self.runs.read().map_err(|_| StoreError::LockPoisoned)?;
        runs.get(id).cloned().ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn list_runs(&self) -> Result<Vec<RunId>> {
        let runs = self.runs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(runs.keys().cloned().collect())
    }

    fn delete_run(&self, id: &RunId) -> Result<()> {
        let mut runs = self.runs.write().map_err(|_| StoreError::LockPoisoned)?;
        runs.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rules::RunRules;
    use crate::game::state::GameConfig;

    #[test]
    fn test_save_load_delete() {
        let store = MemoryRunStore::new();
        let mut state = RunState::new(GameConfig::default(), RunRules::default());
        state.requisition = 7;

        let id = store.save_run(&state).unwrap();
        assert_eq!(store.load_run(&id).unwrap(), state);
        assert_eq!(store.list_runs().unwrap(), vec![id.clone()]);

        store.delete_run(&id).unwrap();
        assert!(matches!(store.load_run(&id), Err(StoreError::NotFound(_))));
        assert!(store.list_runs().unwrap().is_empty());
    }
}
