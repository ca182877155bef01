//! Mission Resolution
//!
//! Applies a mission report to the run: requisition reward, operation
//! progress and the difficulty ladder, lives or item sacrifices for players
//! who failed to extract, and the end-of-run check.

use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};

use crate::game::error::RunError;
use crate::game::item::ItemId;
use crate::game::loadout::{LoadoutManager, SlotKind};
use crate::game::state::{PlayerId, RunOutcome, RunState};

/// Outcome of a played mission, as reported by the players.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionReport {
    /// Mission objectives completed
    pub success: bool,
    /// Per-player extraction; players left out count as extracted
    #[serde(default)]
    pub extracted: BTreeMap<PlayerId, bool>,
}

impl MissionReport {
    /// Everyone extracted.
    pub fn clean(success: bool) -> Self {
        Self { success, extracted: BTreeMap::new() }
    }

    /// Whether a player made it out.
    pub fn did_extract(&self, player: &PlayerId) -> bool {
        self.extracted.get(player).copied().unwrap_or(true)
    }
}

/// What a mission changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionSummary {
    /// Objectives completed
    pub success: bool,
    /// Lives spent on failed extractions
    pub lives_lost: u32,
    /// Requisition granted
    pub requisition_gained: u32,
    /// The mission finished an operation
    pub operation_complete: bool,
    /// Difficulty before the mission
    pub difficulty_before: u8,
    /// Difficulty after the mission
    pub difficulty_after: u8,
    /// Players who now owe an item
    pub sacrifices_owed: BTreeSet<PlayerId>,
}

/// Apply a mission report.
pub fn resolve_mission(state: &mut RunState, report: &MissionReport) -> MissionSummary {
    let difficulty_before = state.difficulty;
    let brutality = state.config.brutality_mode;

    let mut lives_lost = 0u32;
    let mut sacrifices_owed = BTreeSet::new();

    for player in state.players.iter_mut() {
        player.extracted = report.did_extract(&player.id);
        if player.extracted {
            continue;
        }

        if brutality {
            // Nothing unlocked to give means nothing owed
            if !LoadoutManager::new(player).sacrificable_slots().is_empty() {
                sacrifices_owed.insert(player.id);
            }
        } else {
            lives_lost += 1;
        }
    }

    state.lives = state.lives.saturating_sub(lives_lost);
    state.pending_sacrifices.extend(sacrifices_owed.iter().copied());

    let mut requisition_gained = 0;
    let mut operation_complete = false;

    if report.success {
        requisition_gained = state.rules.mission_reward;
        state.requisition = state.requisition.saturating_add(requisition_gained);
        state.missions_completed += 1;
        state.operation_progress += 1;

        let missions_needed = if state.config.endurance_mode {
            state.rules.endurance_missions_per_operation
        } else {
            1
        };

        if state.operation_progress >= missions_needed {
            operation_complete = true;
            state.operation_progress = 0;
            state.draft_ready = true;
            state.difficulty = if state.config.endless_mode {
                state.difficulty.saturating_add(1).min(state.rules.max_difficulty)
            } else {
                state.difficulty.saturating_add(1)
            };
        }
    }

    MissionSummary {
        success: report.success,
        lives_lost,
        requisition_gained,
        operation_complete,
        difficulty_before,
        difficulty_after: state.difficulty,
        sacrifices_owed,
    }
}

/// Whether the run is over, and how.
pub fn terminal_outcome(state: &RunState) -> Option<RunOutcome> {
    if state.lives == 0 {
        return Some(RunOutcome::Defeat);
    }
    if !state.config.endless_mode && state.difficulty > state.rules.max_difficulty {
        return Some(RunOutcome::Victory);
    }
    None
}

/// Give up the item in `slot` to settle a player's sacrifice.
pub fn sacrifice_item(
    state: &mut RunState,
    player_id: PlayerId,
    slot: SlotKind,
) -> Result<ItemId, RunError> {
    if !state.pending_sacrifices.contains(&player_id) {
        return Err(RunError::NoSacrificeOwed(player_id));
    }
    let player = state
        .player_mut(&player_id)
        .ok_or(RunError::UnknownPlayer(player_id))?;

    let item = LoadoutManager::new(player).sacrifice(slot)?;
    state.pending_sacrifices.remove(&player_id);
    Ok(item)
}

/// Drop owed sacrifices that can no longer be paid.
pub fn release_unpayable_sacrifices(state: &mut RunState) {
    let owing: Vec<PlayerId> = state.pending_sacrifices.iter().copied().collect();
    for id in owing {
        let payable = state
            .player_mut(&id)
            .is_some_and(|p| !LoadoutManager::new(p).sacrificable_slots().is_empty());
        if !payable {
            state.pending_sacrifices.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::loadout::Loadout;
    use crate::game::state::Player;

    fn run_with_players(n: u8) -> RunState {
        let mut state = RunState::default();
        let rules = state.rules.clone();
        for i in 0..n {
            state.players.push(Player::new(
                PlayerId::new([i + 1; 16]),
                format!("P{}", i),
                Loadout::starter(),
                &rules,
            ));
        }
        state
    }

    #[test]
    fn test_success_rewards_and_advances() {
        let mut state = run_with_players(1);
        let summary = resolve_mission(&mut state, &MissionReport::clean(true));

        assert_eq!(summary.requisition_gained, state.rules.mission_reward);
        assert_eq!(state.requisition, state.rules.mission_reward);
        assert!(summary.operation_complete);
        assert_eq!(state.difficulty, 2);
        assert!(state.draft_ready);
    }

    #[test]
    fn test_failure_gives_nothing() {
        let mut state = run_with_players(1);
        let summary = resolve_mission(&mut state, &MissionReport::clean(false));

        assert_eq!(summary.requisition_gained, 0);
        assert_eq!(summary.lives_lost, 0);
        assert_eq!(state.difficulty, 1);
        assert!(!state.draft_ready);
    }

    #[test]
    fn test_failed_extraction_costs_a_life() {
        let mut state = run_with_players(2);
        let stranded = state.players[1].id;
        let mut report = MissionReport::clean(true);
        report.extracted.insert(stranded, false);

        let summary = resolve_mission(&mut state, &report);
        assert_eq!(summary.lives_lost, 1);
        assert_eq!(state.lives, state.rules.starting_lives - 1);
        assert!(!state.players[1].extracted);
        assert!(state.players[0].extracted);
    }

    #[test]
    fn test_brutality_owes_item_instead() {
        let mut state = run_with_players(1);
        state.config.brutality_mode = true;
        let id = state.players[0].id;
        let mut report = MissionReport::clean(false);
        report.extracted.insert(id, false);

        let summary = resolve_mission(&mut state, &report);
        assert_eq!(summary.lives_lost, 0);
        assert!(state.pending_sacrifices.contains(&id));

        state.players[0].locked_slots.insert(SlotKind::Primary);
        assert_eq!(
            sacrifice_item(&mut state, id, SlotKind::Primary),
            Err(RunError::SlotLocked(SlotKind::Primary))
        );
        assert_eq!(sacrifice_item(&mut state, id, SlotKind::Armor).unwrap(), "b01_tactical");
        assert!(state.pending_sacrifices.is_empty());
        assert_eq!(
            sacrifice_item(&mut state, id, SlotKind::Grenade),
            Err(RunError::NoSacrificeOwed(id))
        );
    }

    #[test]
    fn test_empty_loadout_owes_nothing() {
        let mut state = run_with_players(1);
        state.config.brutality_mode = true;
        state.players[0].loadout = Loadout::default();
        let id = state.players[0].id;

        let mut report = MissionReport::clean(false);
        report.extracted.insert(id, false);
        let summary = resolve_mission(&mut state, &report);
        assert!(summary.sacrifices_owed.is_empty());

        state.pending_sacrifices.insert(id);
        release_unpayable_sacrifices(&mut state);
        assert!(state.pending_sacrifices.is_empty());
    }

    #[test]
    fn test_endurance_needs_several_successes() {
        let mut state = run_with_players(1);
        state.config.endurance_mode = true;
        let needed = state.rules.endurance_missions_per_operation;

        for _ in 1..needed {
            let summary = resolve_mission(&mut state, &MissionReport::clean(true));
            assert!(!summary.operation_complete);
        }
        let summary = resolve_mission(&mut state, &MissionReport::clean(true));
        assert!(summary.operation_complete);
        assert_eq!(state.difficulty, 2);
        assert_eq!(state.operation_progress, 0);
    }

    #[test]
    fn test_terminal_outcomes() {
        let mut state = run_with_players(1);
        assert_eq!(terminal_outcome(&state), None);

        state.difficulty = state.rules.max_difficulty;
        resolve_mission(&mut state, &MissionReport::clean(true));
        assert_eq!(terminal_outcome(&state), Some(RunOutcome::Victory));

        state.lives = 0;
        assert_eq!(terminal_outcome(&state), Some(RunOutcome::Defeat));
    }

    #[test]
    fn test_endless_caps_difficulty() {
        let mut state = run_with_players(1);
        state.config.endless_mode = true;
        state.difficulty = state.rules.max_difficulty;

        resolve_mission(&mut state, &MissionReport::clean(true));
        assert_eq!(state.difficulty, state.rules.max_difficulty);
        assert_eq!(terminal_outcome(&state), None);
    }
}
