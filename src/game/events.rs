//! Run Events
//!
//! Events produced by each reduction, for logging and for the UI.
//! They describe what changed; the state itself stays the source of truth.

use serde::{Serialize, Deserialize};

use crate::game::draft::DraftCard;
use crate::game::item::ItemId;
use crate::game::loadout::SlotKind;
use crate::game::mission::MissionSummary;
use crate::game::state::{Phase, PlayerId, RunOutcome};

/// Event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEventData {
    /// Phase changed
    PhaseChanged {
        old_phase: Phase,
        new_phase: Phase,
    },

    /// Run entered the dashboard with fresh counters
    RunStarted {
        difficulty: u8,
        player_count: usize,
    },

    /// A draft round was offered
    RoundOpened {
        player_id: PlayerId,
        cards: Vec<DraftCard>,
    },

    /// Nothing eligible; the round resolved with no pick
    EmptyRound {
        player_id: PlayerId,
    },

    /// A card was picked
    CardPicked {
        player_id: PlayerId,
        item_ids: Vec<ItemId>,
    },

    /// A card was discarded from the hand
    CardRemoved {
        player_id: PlayerId,
        index: usize,
    },

    /// The hand was regenerated for requisition
    Rerolled {
        player_id: PlayerId,
        cost: u32,
    },

    /// A drafted stratagem needs a free slot
    StratagemPending {
        player_id: PlayerId,
        item_id: ItemId,
    },

    /// A stratagem slot was swapped
    StratagemReplaced {
        player_id: PlayerId,
        slot: usize,
        old_item: Option<ItemId>,
        new_item: ItemId,
    },

    /// The pending stratagem was discarded
    ReplacementCancelled {
        player_id: PlayerId,
        item_id: ItemId,
    },

    /// A slot was locked
    SlotLocked {
        player_id: PlayerId,
        slot: SlotKind,
    },

    /// A slot was unlocked
    SlotUnlocked {
        player_id: PlayerId,
        slot: SlotKind,
    },

    /// Mission report applied
    MissionResolved {
        summary: MissionSummary,
    },

    /// An item was given up
    ItemSacrificed {
        player_id: PlayerId,
        slot: SlotKind,
        item_id: ItemId,
    },

    /// Run finished
    RunEnded {
        outcome: RunOutcome,
    },

    /// Player connection status changed
    PlayerConnection {
        player_id: PlayerId,
        connected: bool,
    },

    /// Player joined the lobby
    PlayerJoined {
        player_id: PlayerId,
    },

    /// Player left the lobby
    PlayerLeft {
        player_id: PlayerId,
    },

    /// A raw setter overwrote a field
    FieldOverridden {
        field: String,
    },
}

/// A run event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Player involved, if any
    pub player_id: Option<PlayerId>,

    /// Event data
    pub data: RunEventData,
}

impl RunEvent {
    /// Create a new event.
    pub fn new(data: RunEventData) -> Self {
        let player_id = match &data {
            RunEventData::RoundOpened { player_id, .. }
            | RunEventData::EmptyRound { player_id }
            | RunEventData::CardPicked { player_id, .. }
            | RunEventData::CardRemoved { player_id, .. }
            | RunEventData::Rerolled { player_id, .. }
            | RunEventData::StratagemPending { player_id, .. }
            | RunEventData::StratagemReplaced { player_id, .. }
            | RunEventData::ReplacementCancelled { player_id, .. }
            | RunEventData::SlotLocked { player_id, .. }
            | RunEventData::SlotUnlocked { player_id, .. }
            | RunEventData::ItemSacrificed { player_id, .. }
            | RunEventData::PlayerConnection { player_id, .. }
            | RunEventData::PlayerJoined { player_id }
            | RunEventData::PlayerLeft { player_id } => Some(*player_id),
            _ => None,
        };

        Self { player_id, data }
    }

    /// Phase change event.
    pub fn phase_changed(old_phase: Phase, new_phase: Phase) -> Self {
        Self::new(RunEventData::PhaseChanged { old_phase, new_phase })
    }

    /// Raw setter event.
    pub fn field_overridden(field: &str) -> Self {
        Self::new(RunEventData::FieldOverridden { field: field.to_string() })
    }

    /// Only surfaced when the run has debug events on.
    pub fn is_debug(&self) -> bool {
        matches!(
            self.data,
            RunEventData::FieldOverridden { .. } | RunEventData::PlayerConnection { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_extracted() {
        let id = PlayerId::new([3; 16]);
        let event = RunEvent::new(RunEventData::EmptyRound { player_id: id });
        assert_eq!(event.player_id, Some(id));

        let event = RunEvent::phase_changed(Phase::Menu, Phase::Config);
        assert_eq!(event.player_id, None);
    }

    #[test]
    fn test_debug_classification() {
        assert!(RunEvent::field_overridden("lives").is_debug());
        assert!(!RunEvent::phase_changed(Phase::Dashboard, Phase::Draft).is_debug());
    }
}
