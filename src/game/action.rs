//! Run Actions
//!
//! The closed set of intents the reducer accepts. This is the entire
//! mutation surface offered to a presentation layer or a remote peer.
//!
//! ## Wire Format
//!
//! JSON, adjacently tagged:
//!
//! ```json
//! {"type": "pick_card", "payload": {"player_id": "…", "index": 1}}
//! ```
//!
//! Unrecognized `type` values decode to [`Action::Unknown`], which reduces
//! to a no-op.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

use crate::game::item::ItemId;
use crate::game::loadout::{Loadout, SlotKind};
use crate::game::mission::MissionReport;
use crate::game::state::{GameConfig, Phase, Player, PlayerId};

/// Edit to the custom start screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomSetupUpdate {
    /// Starting difficulty
    Difficulty {
        /// Chosen difficulty
        difficulty: u8,
    },
    /// Replace a whole starting loadout
    Loadout {
        /// Player being edited
        player_id: PlayerId,
        /// New loadout
        loadout: Loadout,
    },
    /// Set one starting slot
    Slot {
        /// Player being edited
        player_id: PlayerId,
        /// Slot to set
        slot: SlotKind,
        /// Item, or `None` to clear
        item: Option<ItemId>,
    },
}

impl CustomSetupUpdate {
    /// Player the edit targets, if any.
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            CustomSetupUpdate::Difficulty { .. } => None,
            CustomSetupUpdate::Loadout { player_id, .. }
            | CustomSetupUpdate::Slot { player_id, .. } => Some(*player_id),
        }
    }
}

/// A dispatched intent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Action {
    /// Plain navigation between menu screens
    SetPhase(Phase),
    /// Abandon the run and return to the menu
    CancelRun,
    /// Replace the player list
    SetPlayers(Vec<Player>),
    /// Overwrite the difficulty
    SetDifficulty(u8),
    /// Overwrite the requisition
    SetRequisition(u32),
    /// Overwrite the lives
    SetLives(u32),
    /// Replace the run configuration
    SetGameConfig(GameConfig),
    /// Replace the burned set
    SetBurnedCards(BTreeSet<ItemId>),
    /// Edit the custom start
    UpdateCustomSetup(CustomSetupUpdate),

    /// Add a player to the lobby
    JoinLobby {
        /// New player
        player_id: PlayerId,
        /// Display name
        name: String,
    },
    /// Remove a player from the lobby
    LeaveLobby {
        /// Leaving player
        player_id: PlayerId,
    },
    /// Record connection status
    SetPlayerConnected {
        /// Player
        player_id: PlayerId,
        /// Connected or not
        connected: bool,
    },
    /// Record owned warbonds
    SetPlayerWarbonds {
        /// Player
        player_id: PlayerId,
        /// Owned warbond ids
        warbonds: BTreeSet<String>,
        /// Superstore items allowed
        superstore: bool,
    },

    /// Leave config/lobby for the run (or custom setup)
    StartRun,
    /// Leave custom setup for the run
    ConfirmCustomSetup,

    /// Apply a mission outcome
    RunMission(MissionReport),
    /// Settle an owed sacrifice
    SacrificeItem {
        /// Paying player
        player_id: PlayerId,
        /// Slot given up
        slot: SlotKind,
    },
    /// Leave the mission result screen
    ContinueFromMission,

    /// Open the earned draft
    OpenDraft,
    /// Take a card from the hand
    PickCard {
        /// Drafting player
        player_id: PlayerId,
        /// Card position in the hand
        index: usize,
    },
    /// Discard one card from the hand
    RemoveCard {
        /// Drafting player
        player_id: PlayerId,
        /// Card position in the hand
        index: usize,
    },
    /// Pay to regenerate the hand
    Reroll {
        /// Drafting player
        player_id: PlayerId,
    },
    /// Put the pending stratagem into a slot
    ReplaceStratagem {
        /// Drafting player
        player_id: PlayerId,
        /// Stratagem slot index
        slot: usize,
    },
    /// Discard the pending stratagem
    CancelReplacement {
        /// Drafting player
        player_id: PlayerId,
    },

    /// Pay to lock a slot
    LockSlot {
        /// Owner
        player_id: PlayerId,
        /// Slot
        slot: SlotKind,
    },
    /// Release a lock
    UnlockSlot {
        /// Owner
        player_id: PlayerId,
        /// Slot
        slot: SlotKind,
    },

    /// Anything unrecognized
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetPhase(_) => "set_phase",
            Action::CancelRun => "cancel_run",
            Action::SetPlayers(_) => "set_players",
            Action::SetDifficulty(_) => "set_difficulty",
            Action::SetRequisition(_) => "set_requisition",
            Action::SetLives(_) => "set_lives",
            Action::SetGameConfig(_) => "set_game_config",
            Action::SetBurnedCards(_) => "set_burned_cards",
            Action::UpdateCustomSetup(_) => "update_custom_setup",
            Action::JoinLobby { .. } => "join_lobby",
            Action::LeaveLobby { .. } => "leave_lobby",
            Action::SetPlayerConnected { .. } => "set_player_connected",
            Action::SetPlayerWarbonds { .. } => "set_player_warbonds",
            Action::StartRun => "start_run",
            Action::ConfirmCustomSetup => "confirm_custom_setup",
            Action::RunMission(_) => "run_mission",
            Action::SacrificeItem { .. } => "sacrifice_item",
            Action::ContinueFromMission => "continue_from_mission",
            Action::OpenDraft => "open_draft",
            Action::PickCard { .. } => "pick_card",
            Action::RemoveCard { .. } => "remove_card",
            Action::Reroll { .. } => "reroll",
            Action::ReplaceStratagem { .. } => "replace_stratagem",
            Action::CancelReplacement { .. } => "cancel_replacement",
            Action::LockSlot { .. } => "lock_slot",
            Action::UnlockSlot { .. } => "unlock_slot",
            Action::Unknown => "unknown",
        }
    }

    /// The single player a per-player action acts for.
    pub fn actor(&self) -> Option<PlayerId> {
        match self {
            Action::JoinLobby { player_id, .. }
            | Action::LeaveLobby { player_id }
            | Action::SetPlayerConnected { player_id, .. }
            | Action::SetPlayerWarbonds { player_id, .. }
            | Action::SacrificeItem { player_id, .. }
            | Action::PickCard { player_id, .. }
            | Action::RemoveCard { player_id, .. }
            | Action::Reroll { player_id }
            | Action::ReplaceStratagem { player_id, .. }
            | Action::CancelReplacement { player_id }
            | Action::LockSlot { player_id, .. }
            | Action::UnlockSlot { player_id, .. } => Some(*player_id),
            Action::UpdateCustomSetup(update) => update.player_id(),
            _ => None,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let action = Action::Reroll { player_id: PlayerId::new([1; 16]) };
        let json = action.to_json().unwrap();
        assert!(json.contains("\"type\":\"reroll\""));
        assert!(json.contains("\"payload\""));
        assert_eq!(Action::from_json(&json).unwrap(), action);
    }

    #[test]
    fn test_unit_actions_decode() {
        assert_eq!(Action::from_json(r#"{"type":"start_run"}"#).unwrap(), Action::StartRun);
    }

    #[test]
    fn test_unknown_type_decodes_to_unknown() {
        let action = Action::from_json(r#"{"type":"summon_bile_titan"}"#).unwrap();
        assert_eq!(action, Action::Unknown);
    }

    #[test]
    fn test_actor() {
        let id = PlayerId::new([4; 16]);
        assert_eq!(Action::LockSlot { player_id: id, slot: SlotKind::Armor }.actor(), Some(id));
        assert_eq!(Action::StartRun.actor(), None);
        assert_eq!(
            Action::UpdateCustomSetup(CustomSetupUpdate::Difficulty { difficulty: 3 }).actor(),
            None
        );
    }
}
