//! Run State Definitions
//!
//! All state types for a drafting run.
//! Uses BTreeMap/BTreeSet for deterministic iteration order, so the same
//! state always encodes (and hashes) to the same bytes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::hash::{digest_serialized, StateHash};
use crate::core::rng::DeterministicRng;
use crate::game::draft::DraftCard;
use crate::game::item::ItemId;
use crate::game::loadout::{Loadout, SlotKind};
use crate::game::mission::MissionSummary;
use crate::game::rules::RunRules;

/// Domain separator for run state digests.
const STATE_DOMAIN: &[u8] = b"HELLDRAFT_STATE_V1";

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier (UUID as bytes).
///
/// Implements Ord for deterministic BTreeMap ordering. Human-readable
/// formats see the UUID string so the id can key a JSON object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Fresh random id.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uuid_string())
    }
}

impl Serialize for PlayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_uuid_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            PlayerId::from_uuid_str(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid player id: {}", s)))
        } else {
            <[u8; 16]>::deserialize(deserializer).map(PlayerId)
        }
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// A participant in the run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player identifier
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Equipped items
    pub loadout: Loadout,
    /// Every item id ever held this run
    pub inventory: BTreeSet<ItemId>,
    /// Slots exempt from sacrifice
    pub locked_slots: BTreeSet<SlotKind>,
    /// Extracted from the last mission
    pub extracted: bool,
    /// Connection status (multiplayer)
    pub is_connected: bool,
    /// Warbonds the player owns
    pub warbonds: BTreeSet<String>,
    /// Superstore items allowed
    pub superstore: bool,
}

impl Player {
    /// Create a player with a starting loadout and the rules' default warbonds.
    pub fn new(id: PlayerId, name: impl Into<String>, loadout: Loadout, rules: &RunRules) -> Self {
        let mut player = Self {
            id,
            name: name.into(),
            loadout,
            inventory: BTreeSet::new(),
            locked_slots: BTreeSet::new(),
            extracted: true,
            is_connected: true,
            warbonds: rules.default_warbonds.iter().cloned().collect(),
            superstore: false,
        };
        player.reset_inventory();
        player
    }

    /// Inventory becomes exactly what is equipped.
    pub fn reset_inventory(&mut self) {
        self.inventory = self.loadout.equipped().map(|(_, id)| id.clone()).collect();
    }
}

// =============================================================================
// PHASE
// =============================================================================

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Cleared the final difficulty
    Victory,
    /// Ran out of lives
    Defeat,
}

/// Run lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Main menu, no run
    Menu,
    /// Solo configuration
    Config,
    /// Multiplayer lobby
    Lobby,
    /// Custom starting difficulty / loadouts
    CustomSetup,
    /// Between missions
    Dashboard,
    /// Draft rounds open
    Draft,
    /// Mission outcome shown
    MissionResult,
    /// Run finished
    GameOver {
        /// Final outcome
        outcome: RunOutcome,
    },
}

impl Phase {
    /// Whether a run is in progress.
    pub fn in_run(self) -> bool {
        matches!(
            self,
            Phase::Dashboard | Phase::Draft | Phase::MissionResult
        )
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Enemy faction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    /// Bugs
    #[default]
    Terminids,
    /// Bots
    Automatons,
    /// Squids
    Illuminate,
}

/// Run configuration chosen before start.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Enemy faction
    pub faction: Faction,
    /// Optional subfaction; may scale rare weights
    pub subfaction: Option<String>,
    /// An item drafted by anyone leaves everyone's pool
    pub global_uniqueness: bool,
    /// Picked items are burned for the rest of the run
    pub burn_cards: bool,
    /// Start through the custom setup screen
    pub custom_start: bool,
    /// Several missions per operation
    pub endurance_mode: bool,
    /// No victory at max difficulty
    pub endless_mode: bool,
    /// Failed extraction costs an item instead of a life
    pub brutality_mode: bool,
    /// Surface debug-only events
    pub debug_events_mode: bool,
    /// Expose the eligible pool to the UI
    pub show_card_pool: bool,
    /// Multiplayer session
    pub multiplayer: bool,
    /// Seed for draft randomness
    pub seed: u64,
    /// Difficulty a non-custom run starts at
    pub starting_difficulty: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            faction: Faction::default(),
            subfaction: None,
            global_uniqueness: false,
            burn_cards: false,
            custom_start: false,
            endurance_mode: false,
            endless_mode: false,
            brutality_mode: false,
            debug_events_mode: false,
            show_card_pool: false,
            multiplayer: false,
            seed: 0,
            starting_difficulty: 1,
        }
    }
}

// =============================================================================
// DRAFT / SETUP
// =============================================================================

/// In-progress draft.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftState {
    /// Index into `RunState::players` of the drafting player
    pub player_index: usize,
    /// Cards currently offered
    pub round_cards: Vec<DraftCard>,
    /// Stratagem awaiting a replace/cancel decision
    pub pending_stratagem: Option<ItemId>,
}

/// Custom start choices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSetup {
    /// Starting difficulty
    pub difficulty: u8,
    /// Starting loadout per player
    pub loadouts: BTreeMap<PlayerId, Loadout>,
}

// =============================================================================
// RUN STATE
// =============================================================================

/// Complete run state.
///
/// The only mutable aggregate. Replaced wholesale by each reduction and
/// replicated as a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Lifecycle phase
    pub phase: Phase,
    /// Run configuration
    pub config: GameConfig,
    /// Balance table
    pub rules: RunRules,
    /// Current difficulty tier
    pub difficulty: u8,
    /// Shared currency
    pub requisition: u32,
    /// Shared lives
    pub lives: u32,
    /// Players in turn order
    pub players: Vec<Player>,
    /// Permanently excluded item ids
    pub burned_cards: BTreeSet<ItemId>,
    /// Custom start choices
    pub custom_setup: Option<CustomSetup>,
    /// Open draft
    pub draft: Option<DraftState>,
    /// A completed operation has earned a draft
    pub draft_ready: bool,
    /// Outcome of the last mission
    pub last_mission: Option<MissionSummary>,
    /// Players who owe an item sacrifice
    pub pending_sacrifices: BTreeSet<PlayerId>,
    /// Successful missions this run
    pub missions_completed: u32,
    /// Successful missions in the current operation
    pub operation_progress: u32,
    /// Draft randomness
    pub rng: DeterministicRng,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new(GameConfig::default(), RunRules::default())
    }
}

impl RunState {
    /// Fresh state at the main menu.
    pub fn new(config: GameConfig, rules: RunRules) -> Self {
        let rng = DeterministicRng::new(config.seed);
        Self {
            phase: Phase::Menu,
            difficulty: config.starting_difficulty.max(1),
            requisition: rules.starting_requisition,
            lives: rules.starting_lives,
            config,
            rules,
            players: Vec::new(),
            burned_cards: BTreeSet::new(),
            custom_setup: None,
            draft: None,
            draft_ready: false,
            last_mission: None,
            pending_sacrifices: BTreeSet::new(),
            missions_completed: 0,
            operation_progress: 0,
            rng,
        }
    }

    /// Get a player.
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *id)
    }

    /// Get a player mutably.
    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == *id)
    }

    /// Turn-order position of a player.
    pub fn player_index(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == *id)
    }

    /// The player whose round is open.
    pub fn active_drafter(&self) -> Option<&Player> {
        self.draft
            .as_ref()
            .and_then(|d| self.players.get(d.player_index))
    }

    /// Union of every player's inventory.
    pub fn all_inventories(&self) -> BTreeSet<&ItemId> {
        self.players.iter().flat_map(|p| p.inventory.iter()).collect()
    }

    /// Digest of the canonical encoding.
    pub fn compute_hash(&self) -> Result<StateHash, bincode::Error> {
        digest_serialized(STATE_DOMAIN, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_uuid_roundtrip() {
        let id = PlayerId::random();
        let parsed = PlayerId::from_uuid_str(&id.to_uuid_string()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(format!("{}", id), id.to_uuid_string());
    }

    #[test]
    fn test_player_id_keys_json_objects() {
        let mut map = BTreeMap::new();
        map.insert(PlayerId::new([7; 16]), true);

        let json = serde_json::to_string(&map).unwrap();
        assert!(json.contains("07070707-0707"));

        let back: BTreeMap<PlayerId, bool> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_new_player_inventory_matches_loadout() {
        let rules = RunRules::default();
        let player = Player::new(PlayerId::new([1; 16]), "Alpha", Loadout::starter(), &rules);

        assert_eq!(player.inventory.len(), 4);
        assert!(player.inventory.contains("b01_tactical"));
        assert!(player.warbonds.contains("helldivers_mobilize"));
        assert!(player.is_connected);
    }

    #[test]
    fn test_state_hash_determinism() {
        let a = RunState::default();
        let b = RunState::default();
        assert_eq!(a.compute_hash().unwrap(), b.compute_hash().unwrap());

        let mut c = RunState::default();
        c.requisition += 1;
        assert_ne!(a.compute_hash().unwrap(), c.compute_hash().unwrap());
    }

    #[test]
    fn test_bincode_roundtrip_preserves_state() {
        let rules = RunRules::default();
        let mut state = RunState::default();
        state.players.push(Player::new(PlayerId::new([2; 16]), "Bravo", Loadout::starter(), &rules));
        state.phase = Phase::GameOver { outcome: RunOutcome::Victory };

        let bytes = bincode::serialize(&state).unwrap();
        let back: RunState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, state);
    }
}
