//! File-backed RunStore.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::game::state::RunState;
use crate::store::{Result, RunId, RunStore, SavedRun, StoreError};

/// Stores each run as `run_{id}.bin`, a bincode-encoded [`SavedRun`].
///
/// Writes go to a temp file first and are renamed into place, so a crash
/// never leaves a half-written save behind.
pub struct FileRunStore {
    base_dir: PathBuf,
}

impl FileRunStore {
    /// Open (creating if needed) a store rooted at `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn run_path(&self, id: &RunId) -> PathBuf {
        self.base_dir.join(format!("run_{}.bin", id))
    }

    fn write(&self, saved: &SavedRun) -> Result<()> {
        let path = self.run_path(&saved.id);
        let temp_path = path.with_extension("bin.tmp");

        let bytes =
            bincode::serialize(saved).map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        debug!(run = %saved.id, path = %path.display(), "Saved run");
        Ok(())
    }
}

impl RunStore for FileRunStore {
    fn save_run(&self, state: &RunState) -> Result<RunId> {
        let saved = SavedRun::new(state.clone());
        self.write(&saved)?;
        Ok(saved.id)
    }

    fn load_saved(&self, id: &RunId) -> Result<SavedRun> {
        let path = self.run_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.clone()));
        }

        let bytes = fs::read(&path)?;
        let saved: SavedRun =
            bincode::deserialize(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;

        debug!(run = %id, "Loaded run");
        Ok(saved)
    }

    fn list_runs(&self) -> Result<Vec<RunId>> {
        let mut ids = Vec::new();

        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            let stem = path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|name| name.strip_prefix("run_"))
                .and_then(|name| name.strip_suffix(".bin"));

            if let Some(id) = stem.and_then(|s| RunId::parse(s).ok()) {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }

    fn delete_run(&self, id: &RunId) -> Result<()> {
        let path = self.run_path(id);
        if path.exists() {
            fs::remove_file(&path)?;
            debug!(run = %id, "Deleted run");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use crate::game::action::Action;
    use crate::game::item::Catalog;
    use crate::game::mission::MissionReport;
    use crate::game::reducer::reduce;
    use crate::game::rules::RunRules;
    use crate::game::state::{GameConfig, Phase, Player, PlayerId};

    fn started_run(catalog: &Catalog) -> RunState {
        let rules = RunRules::default();
        let config = GameConfig { seed: 42, ..GameConfig::default() };
        let state = RunState::new(config, rules.clone());
        let player = Player::new(PlayerId::new([1; 16]), "Solo", rules.default_loadout.clone(), &rules);

        let state = reduce(&state, &Action::SetPhase(Phase::Config), catalog).state;
        let state = reduce(&state, &Action::SetPlayers(vec![player]), catalog).state;
        reduce(&state, &Action::StartRun, catalog).state
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRunStore::new(temp_dir.path()).unwrap();
        let catalog = Catalog::builtin().unwrap();
        let state = started_run(&catalog);

        let id = store.save_run(&state).unwrap();
        let saved = store.load_saved(&id).unwrap();
        assert_eq!(saved.id, id);
        assert_eq!(saved.state, state);
        assert_eq!(store.list_runs().unwrap(), vec![id]);
    }

    #[test]
    fn test_loaded_run_reduces_identically() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRunStore::new(temp_dir.path()).unwrap();
        let catalog = Catalog::builtin().unwrap();
        let state = started_run(&catalog);
        assert_eq!(state.phase, Phase::Dashboard);

        let id = store.save_run(&state).unwrap();
        let loaded = store.load_run(&id).unwrap();

        let actions = [
            Action::RunMission(MissionReport::clean(true)),
            Action::ContinueFromMission,
            Action::OpenDraft,
        ];
        let mut original = state;
        let mut restored = loaded;
        for action in &actions {
            original = reduce(&original, action, &catalog).state;
            restored = reduce(&restored, action, &catalog).state;
        }

        assert_eq!(original.phase, Phase::Draft);
        assert_eq!(original.compute_hash().unwrap(), restored.compute_hash().unwrap());
    }

    #[test]
    fn test_missing_and_deleted_runs() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRunStore::new(temp_dir.path()).unwrap();
        let catalog = Catalog::builtin().unwrap();

        let missing = RunId::generate();
        assert!(matches!(store.load_run(&missing), Err(StoreError::NotFound(_))));

        let id = store.save_run(&started_run(&catalog)).unwrap();
        store.delete_run(&id).unwrap();
        store.delete_run(&id).unwrap();
        assert!(store.list_runs().unwrap().is_empty());
    }

    #[test]
    fn test_foreign_files_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes.txt"), b"hello").unwrap();
        fs::write(temp_dir.path().join("run_not-a-uuid.bin"), b"junk").unwrap();

        let store = FileRunStore::new(temp_dir.path()).unwrap();
        assert!(store.list_runs().unwrap().is_empty());
    }
}
