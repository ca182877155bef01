//! Run Reducer
//!
//! The single entry point for state change: `reduce(state, action)`.
//!
//! ## Contract
//!
//! - Pure: the input state is never touched; a new state is returned.
//! - Total: every action on every state yields a state. Nothing panics.
//! - Atomic: a rejected action returns the input state unchanged together
//!   with the [`RunError`] that explains why.
//! - Deterministic: all randomness comes from the RNG carried in the state.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::core::rng::DeterministicRng;
use crate::game::action::{Action, CustomSetupUpdate};
use crate::game::armor::ArmorIndex;
use crate::game::draft::{draw_for_player, DraftCard};
use crate::game::error::RunError;
use crate::game::events::{RunEvent, RunEventData};
use crate::game::item::{Catalog, ItemId};
use crate::game::loadout::{Loadout, LoadoutManager, SlotKind, StratagemEquip};
use crate::game::mission::{
    release_unpayable_sacrifices, resolve_mission, sacrifice_item, terminal_outcome, MissionReport,
};
use crate::game::state::{CustomSetup, DraftState, GameConfig, Phase, Player, PlayerId, RunState};

/// Result of one reduction.
#[derive(Clone, Debug)]
pub struct Reduction {
    /// The next state (the input state when rejected)
    pub state: RunState,
    /// Why the action was rejected, if it was
    pub error: Option<RunError>,
    /// What changed
    pub events: Vec<RunEvent>,
}

impl Reduction {
    /// Whether the action was applied.
    pub fn is_applied(&self) -> bool {
        self.error.is_none()
    }
}

/// Apply one action.
pub fn reduce(state: &RunState, action: &Action, catalog: &Catalog) -> Reduction {
    let mut next = state.clone();
    let mut reducer = RunReducer::new(&mut next, catalog);

    match reducer.apply(action) {
        Ok(()) => {
            let mut events = reducer.events;
            if !next.config.debug_events_mode {
                events.retain(|e| !e.is_debug());
            }
            Reduction { state: next, error: None, events }
        }
        Err(error) => {
            match &error {
                RunError::InvalidTransition { from, action } => {
                    warn!(?from, action = %action, "Illegal transition requested");
                }
                other => {
                    debug!(action = action.name(), error = %other, "Action rejected");
                }
            }
            Reduction { state: state.clone(), error: Some(error), events: Vec::new() }
        }
    }
}

// =============================================================================
// REDUCER
// =============================================================================

/// Working context for one reduction.
struct RunReducer<'a> {
    state: &'a mut RunState,
    catalog: &'a Catalog,
    armor: Option<ArmorIndex>,
    events: Vec<RunEvent>,
}

impl<'a> RunReducer<'a> {
    fn new(state: &'a mut RunState, catalog: &'a Catalog) -> Self {
        Self { state, catalog, armor: None, events: Vec::new() }
    }

    fn apply(&mut self, action: &Action) -> Result<(), RunError> {
        match action {
            Action::SetPhase(target) => self.set_phase_action(*target, action),
            Action::CancelRun => {
                self.enter_menu();
                Ok(())
            }
            Action::SetPlayers(players) => self.set_players(players, action),
            Action::SetDifficulty(difficulty) => {
                self.check_difficulty(*difficulty)?;
                self.state.difficulty = *difficulty;
                self.emit(RunEvent::field_overridden("difficulty"));
                self.end_if_terminal();
                Ok(())
            }
            Action::SetRequisition(requisition) => {
                self.state.requisition = *requisition;
                self.emit(RunEvent::field_overridden("requisition"));
                Ok(())
            }
            Action::SetLives(lives) => {
                self.state.lives = *lives;
                self.emit(RunEvent::field_overridden("lives"));
                self.end_if_terminal();
                Ok(())
            }
            Action::SetGameConfig(config) => self.set_game_config(config, action),
            Action::SetBurnedCards(burned) => {
                self.state.burned_cards = burned.clone();
                self.emit(RunEvent::field_overridden("burned_cards"));
                Ok(())
            }
            Action::UpdateCustomSetup(update) => self.update_custom_setup(update, action),

            Action::JoinLobby { player_id, name } => self.join_lobby(*player_id, name, action),
            Action::LeaveLobby { player_id } => self.leave_lobby(*player_id, action),
            Action::SetPlayerConnected { player_id, connected } => {
                let player = self.player_mut(*player_id)?;
                player.is_connected = *connected;
                self.emit(RunEvent::new(RunEventData::PlayerConnection {
                    player_id: *player_id,
                    connected: *connected,
                }));
                Ok(())
            }
            Action::SetPlayerWarbonds { player_id, warbonds, superstore } => {
                self.require(self.pre_run(), action)?;
                let player = self.player_mut(*player_id)?;
                player.warbonds = warbonds.clone();
                player.superstore = *superstore;
                self.emit(RunEvent::field_overridden("warbonds"));
                Ok(())
            }

            Action::StartRun => self.start_run(action),
            Action::ConfirmCustomSetup => self.confirm_custom_setup(action),

            Action::RunMission(report) => self.run_mission(report, action),
            Action::SacrificeItem { player_id, slot } => {
                self.require(self.state.phase == Phase::MissionResult, action)?;
                let item_id = sacrifice_item(self.state, *player_id, *slot)?;
                self.emit(RunEvent::new(RunEventData::ItemSacrificed {
                    player_id: *player_id,
                    slot: *slot,
                    item_id,
                }));
                Ok(())
            }
            Action::ContinueFromMission => self.continue_from_mission(action),

            Action::OpenDraft => self.open_draft(action),
            Action::PickCard { player_id, index } => self.pick_card(*player_id, *index, action),
            Action::RemoveCard { player_id, index } => self.remove_card(*player_id, *index, action),
            Action::Reroll { player_id } => self.reroll(*player_id, action),
            Action::ReplaceStratagem { player_id, slot } => {
                self.replace_stratagem(*player_id, *slot, action)
            }
            Action::CancelReplacement { player_id } => self.cancel_replacement(*player_id, action),

            Action::LockSlot { player_id, slot } => self.lock_slot(*player_id, *slot, action),
            Action::UnlockSlot { player_id, slot } => self.unlock_slot(*player_id, *slot, action),

            Action::Unknown => Ok(()),
        }
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn emit(&mut self, event: RunEvent) {
        self.events.push(event);
    }

    fn require(&self, legal: bool, action: &Action) -> Result<(), RunError> {
        if legal {
            Ok(())
        } else {
            Err(RunError::InvalidTransition {
                from: self.state.phase,
                action: action.name().to_string(),
            })
        }
    }

    fn pre_run(&self) -> bool {
        matches!(
            self.state.phase,
            Phase::Menu | Phase::Config | Phase::Lobby | Phase::CustomSetup
        )
    }

    fn transition(&mut self, new_phase: Phase) {
        let old_phase = self.state.phase;
        if old_phase != new_phase {
            self.state.phase = new_phase;
            self.emit(RunEvent::phase_changed(old_phase, new_phase));
        }
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, RunError> {
        self.state.player_mut(&id).ok_or(RunError::UnknownPlayer(id))
    }

    fn check_difficulty(&self, difficulty: u8) -> Result<(), RunError> {
        if difficulty == 0 || difficulty > self.state.rules.max_difficulty {
            return Err(RunError::InvalidDifficulty(difficulty));
        }
        Ok(())
    }

    /// Reject a roster that names the same player twice.
    fn check_unique_players(players: &[Player]) -> Result<(), RunError> {
        let mut seen = BTreeSet::new();
        if players.iter().all(|p| seen.insert(p.id)) {
            Ok(())
        } else {
            Err(RunError::InvalidLoadout("duplicate player".to_string()))
        }
    }

    /// End a live run whose counters were overridden into a terminal state.
    fn end_if_terminal(&mut self) {
        if !self.state.phase.in_run() {
            return;
        }
        if let Some(outcome) = terminal_outcome(self.state) {
            self.state.pending_sacrifices.clear();
            self.state.draft = None;
            self.state.draft_ready = false;
            self.emit(RunEvent::new(RunEventData::RunEnded { outcome }));
            self.transition(Phase::GameOver { outcome });
        }
    }

    fn ensure_armor_index(&mut self) {
        if self.armor.is_none() {
            self.armor = Some(ArmorIndex::build(self.catalog));
        }
    }

    // =========================================================================
    // NAVIGATION / SETUP
    // =========================================================================

    fn set_phase_action(&mut self, target: Phase, action: &Action) -> Result<(), RunError> {
        let legal = matches!(
            (self.state.phase, target),
            (Phase::Menu, Phase::Config) | (Phase::Menu, Phase::Lobby) | (_, Phase::Menu)
        );
        self.require(legal, action)?;

        match target {
            Phase::Menu => self.enter_menu(),
            Phase::Lobby => {
                self.state.config.multiplayer = true;
                self.transition(target);
            }
            _ => {
                self.state.config.multiplayer = false;
                self.transition(target);
            }
        }
        Ok(())
    }

    /// Destroy the run; config and rules survive.
    fn enter_menu(&mut self) {
        self.state.players.clear();
        self.state.draft = None;
        self.state.custom_setup = None;
        self.state.draft_ready = false;
        self.state.last_mission = None;
        self.state.pending_sacrifices.clear();
        self.transition(Phase::Menu);
    }

    fn set_players(&mut self, players: &[Player], action: &Action) -> Result<(), RunError> {
        self.require(self.pre_run(), action)?;
        Self::check_unique_players(players)?;
        for player in players {
            player.loadout.validate(self.catalog)?;
        }
        self.state.players = players.to_vec();
        self.emit(RunEvent::field_overridden("players"));
        Ok(())
    }

    fn set_game_config(&mut self, config: &GameConfig, action: &Action) -> Result<(), RunError> {
        self.require(self.pre_run(), action)?;
        self.check_difficulty(config.starting_difficulty)?;
        self.state.config = config.clone();
        self.state.difficulty = config.starting_difficulty;
        Ok(())
    }

    fn update_custom_setup(
        &mut self,
        update: &CustomSetupUpdate,
        action: &Action,
    ) -> Result<(), RunError> {
        self.require(self.state.phase == Phase::CustomSetup, action)?;
        let max_difficulty = self.state.rules.max_difficulty;
        let catalog = self.catalog;
        let setup = self
            .state
            .custom_setup
            .as_mut()
            .ok_or_else(|| RunError::InvalidTransition {
                from: Phase::CustomSetup,
                action: action.name().to_string(),
            })?;

        match update {
            CustomSetupUpdate::Difficulty { difficulty } => {
                if *difficulty == 0 || *difficulty > max_difficulty {
                    return Err(RunError::InvalidDifficulty(*difficulty));
                }
                setup.difficulty = *difficulty;
            }
            CustomSetupUpdate::Loadout { player_id, loadout } => {
                let current = setup
                    .loadouts
                    .get_mut(player_id)
                    .ok_or(RunError::UnknownPlayer(*player_id))?;
                loadout.validate(catalog)?;
                *current = loadout.clone();
            }
            CustomSetupUpdate::Slot { player_id, slot, item } => {
                let current = setup
                    .loadouts
                    .get_mut(player_id)
                    .ok_or(RunError::UnknownPlayer(*player_id))?;

                let mut edited = current.clone();
                let target = edited.slot_mut(*slot).ok_or(RunError::InvalidSlot(*slot))?;
                *target = item.clone();
                if let (SlotKind::Stratagem(_), Some(id)) = (slot, item) {
                    if edited.has_duplicate_stratagems() {
                        return Err(RunError::DuplicateStratagem(id.clone()));
                    }
                }
                edited.validate(catalog)?;
                *current = edited;
            }
        }
        Ok(())
    }

    fn join_lobby(&mut self, player_id: PlayerId, name: &str, action: &Action) -> Result<(), RunError> {
        self.require(self.state.phase == Phase::Lobby, action)?;

        if let Some(existing) = self.state.player_mut(&player_id) {
            existing.is_connected = true;
            return Ok(());
        }

        let rules = &self.state.rules;
        let player = Player::new(player_id, name, rules.default_loadout.clone(), rules);
        self.state.players.push(player);
        self.emit(RunEvent::new(RunEventData::PlayerJoined { player_id }));
        Ok(())
    }

    fn leave_lobby(&mut self, player_id: PlayerId, action: &Action) -> Result<(), RunError> {
        self.require(self.state.phase == Phase::Lobby, action)?;
        let index = self
            .state
            .player_index(&player_id)
            .ok_or(RunError::UnknownPlayer(player_id))?;
        self.state.players.remove(index);
        self.emit(RunEvent::new(RunEventData::PlayerLeft { player_id }));
        Ok(())
    }

    fn validate_squad(&self) -> Result<(), RunError> {
        if self.state.players.is_empty() {
            return Err(RunError::InvalidLoadout("no players".to_string()));
        }
        Self::check_unique_players(&self.state.players)?;
        for player in &self.state.players {
            player.loadout.validate(self.catalog)?;
        }
        Ok(())
    }

    fn start_run(&mut self, action: &Action) -> Result<(), RunError> {
        self.require(matches!(self.state.phase, Phase::Config | Phase::Lobby), action)?;
        self.validate_squad()?;
        let difficulty = self.state.config.starting_difficulty;
        self.check_difficulty(difficulty)?;

        if self.state.config.custom_start {
            let loadouts = self
                .state
                .players
                .iter()
                .map(|p| (p.id, p.loadout.clone()))
                .collect();
            self.state.custom_setup = Some(CustomSetup { difficulty, loadouts });
            self.transition(Phase::CustomSetup);
        } else {
            let default_loadout = self.state.rules.default_loadout.clone();
            for player in self.state.players.iter_mut() {
                if player.loadout == Loadout::default() {
                    player.loadout = default_loadout.clone();
                }
            }
            self.begin_run(difficulty);
        }
        Ok(())
    }

    fn confirm_custom_setup(&mut self, action: &Action) -> Result<(), RunError> {
        self.require(self.state.phase == Phase::CustomSetup, action)?;
        let setup = self.state.custom_setup.take().ok_or_else(|| RunError::InvalidTransition {
            from: Phase::CustomSetup,
            action: action.name().to_string(),
        })?;

        self.check_difficulty(setup.difficulty)?;
        for player in self.state.players.iter_mut() {
            if let Some(loadout) = setup.loadouts.get(&player.id) {
                player.loadout = loadout.clone();
            }
        }
        self.validate_squad()?;
        self.begin_run(setup.difficulty);
        Ok(())
    }

    /// Reset counters and enter the dashboard.
    fn begin_run(&mut self, difficulty: u8) {
        let state = &mut *self.state;
        state.difficulty = difficulty;
        state.requisition = state.rules.starting_requisition;
        state.lives = state.rules.starting_lives;
        state.burned_cards.clear();
        state.custom_setup = None;
        state.draft = None;
        state.draft_ready = false;
        state.last_mission = None;
        state.pending_sacrifices.clear();
        state.missions_completed = 0;
        state.operation_progress = 0;
        state.rng = DeterministicRng::new(state.config.seed);

        for player in state.players.iter_mut() {
            player.reset_inventory();
            player.locked_slots.clear();
            player.extracted = true;
        }

        let player_count = state.players.len();
        self.emit(RunEvent::new(RunEventData::RunStarted { difficulty, player_count }));
        self.transition(Phase::Dashboard);
    }

    // =========================================================================
    // MISSIONS
    // =========================================================================

    fn run_mission(&mut self, report: &MissionReport, action: &Action) -> Result<(), RunError> {
        self.require(self.state.phase == Phase::Dashboard && !self.state.draft_ready, action)?;
        if let Some(unknown) = report.extracted.keys().find(|id| self.state.player(id).is_none()) {
            return Err(RunError::UnknownPlayer(*unknown));
        }

        let summary = resolve_mission(self.state, report);
        self.state.last_mission = Some(summary.clone());
        self.emit(RunEvent::new(RunEventData::MissionResolved { summary }));
        self.transition(Phase::MissionResult);
        Ok(())
    }

    fn continue_from_mission(&mut self, action: &Action) -> Result<(), RunError> {
        self.require(self.state.phase == Phase::MissionResult, action)?;

        if let Some(outcome) = terminal_outcome(self.state) {
            self.state.pending_sacrifices.clear();
            self.emit(RunEvent::new(RunEventData::RunEnded { outcome }));
            self.transition(Phase::GameOver { outcome });
            return Ok(());
        }

        release_unpayable_sacrifices(self.state);
        if !self.state.pending_sacrifices.is_empty() {
            return Err(RunError::SacrificePending);
        }
        self.transition(Phase::Dashboard);
        Ok(())
    }

    // =========================================================================
    // DRAFT
    // =========================================================================

    fn open_draft(&mut self, action: &Action) -> Result<(), RunError> {
        self.require(self.state.phase == Phase::Dashboard && self.state.draft_ready, action)?;
        self.state.draft_ready = false;
        self.transition(Phase::Draft);
        self.open_round_from(0);
        Ok(())
    }

    /// Open the next non-empty round at or after `start`. Returns to the
    /// dashboard once every player has been served.
    fn open_round_from(&mut self, start: usize) {
        for player_index in start..self.state.players.len() {
            self.ensure_armor_index();
            let Some(armor) = self.armor.as_ref() else {
                return;
            };
            let cards = draw_for_player(self.catalog, armor, self.state, player_index);
            let player_id = self.state.players[player_index].id;

            if cards.is_empty() {
                self.emit(RunEvent::new(RunEventData::EmptyRound { player_id }));
                continue;
            }

            self.state.draft = Some(DraftState {
                player_index,
                round_cards: cards.clone(),
                pending_stratagem: None,
            });
            self.emit(RunEvent::new(RunEventData::RoundOpened { player_id, cards }));
            return;
        }

        self.state.draft = None;
        self.transition(Phase::Dashboard);
    }

    fn advance_round(&mut self) {
        let next = self.state.draft.as_ref().map_or(usize::MAX, |d| d.player_index + 1);
        self.open_round_from(next);
    }

    /// Index of `player_id` if they hold the open round.
    fn active_round(&self, player_id: PlayerId, action: &Action) -> Result<usize, RunError> {
        self.require(self.state.phase == Phase::Draft, action)?;
        let index = self
            .state
            .player_index(&player_id)
            .ok_or(RunError::UnknownPlayer(player_id))?;
        let draft = self.state.draft.as_ref().ok_or(RunError::NoActiveRound)?;
        if draft.player_index != index {
            return Err(RunError::NotActivePlayer(player_id));
        }
        Ok(index)
    }

    /// Like `active_round`, but also refuses while a replacement is pending.
    fn open_hand(&self, player_id: PlayerId, action: &Action) -> Result<usize, RunError> {
        let index = self.active_round(player_id, action)?;
        if self.state.draft.as_ref().is_some_and(|d| d.pending_stratagem.is_some()) {
            return Err(RunError::ReplacementPending);
        }
        Ok(index)
    }

    fn round_card(&self, index: usize) -> Result<DraftCard, RunError> {
        let cards = self
            .state
            .draft
            .as_ref()
            .map(|d| d.round_cards.as_slice())
            .unwrap_or_default();
        cards
            .get(index)
            .cloned()
            .ok_or(RunError::CardOutOfRange { index, len: cards.len() })
    }

    fn pick_card(&mut self, player_id: PlayerId, index: usize, action: &Action) -> Result<(), RunError> {
        let player_index = self.open_hand(player_id, action)?;
        let card = self.round_card(index)?;
        let burn = self.state.config.burn_cards;

        let item_ids: Vec<ItemId> = card.ids().into_iter().cloned().collect();
        let equip_id = card
            .primary_id()
            .cloned()
            .ok_or_else(|| RunError::InvalidLoadout("empty card".to_string()))?;
        let item_type = self
            .catalog
            .get(&equip_id)
            .map(|item| item.item_type)
            .ok_or_else(|| RunError::InvalidLoadout(format!("unknown item {}", equip_id)))?;

        let state = &mut *self.state;
        let player = state
            .players
            .get_mut(player_index)
            .ok_or(RunError::UnknownPlayer(player_id))?;
        player.inventory.extend(item_ids.iter().cloned());
        if burn {
            state.burned_cards.extend(item_ids.iter().cloned());
        }

        let mut manager = LoadoutManager::new(player);
        let pending = match SlotKind::for_item_type(item_type) {
            Some(slot) => {
                manager.equip(slot, equip_id)?;
                None
            }
            None => match manager.equip_stratagem(equip_id) {
                StratagemEquip::Equipped(_) | StratagemEquip::AlreadyEquipped(_) => None,
                StratagemEquip::Pending { candidate, .. } => Some(candidate),
            },
        };

        self.emit(RunEvent::new(RunEventData::CardPicked { player_id, item_ids }));

        match pending {
            Some(candidate) => {
                if let Some(draft) = self.state.draft.as_mut() {
                    draft.round_cards.clear();
                    draft.pending_stratagem = Some(candidate.clone());
                }
                self.emit(RunEvent::new(RunEventData::StratagemPending {
                    player_id,
                    item_id: candidate,
                }));
            }
            None => self.advance_round(),
        }
        Ok(())
    }

    fn remove_card(&mut self, player_id: PlayerId, index: usize, action: &Action) -> Result<(), RunError> {
        self.open_hand(player_id, action)?;
        self.round_card(index)?;

        let emptied = match self.state.draft.as_mut() {
            Some(draft) => {
                draft.round_cards.remove(index);
                draft.round_cards.is_empty()
            }
            None => return Err(RunError::NoActiveRound),
        };

        self.emit(RunEvent::new(RunEventData::CardRemoved { player_id, index }));
        if emptied {
            self.advance_round();
        }
        Ok(())
    }

    fn reroll(&mut self, player_id: PlayerId, action: &Action) -> Result<(), RunError> {
        let player_index = self.open_hand(player_id, action)?;
        let cost = self.state.rules.reroll_cost;
        if self.state.requisition < cost {
            return Err(RunError::InsufficientRequisition {
                required: cost,
                available: self.state.requisition,
            });
        }

        self.ensure_armor_index();
        let armor = self.armor.as_ref().ok_or(RunError::EmptyPool)?;
        let cards = draw_for_player(self.catalog, armor, self.state, player_index);
        if cards.is_empty() {
            return Err(RunError::EmptyPool);
        }

        self.state.requisition -= cost;
        if let Some(draft) = self.state.draft.as_mut() {
            draft.round_cards = cards.clone();
        }
        self.emit(RunEvent::new(RunEventData::Rerolled { player_id, cost }));
        self.emit(RunEvent::new(RunEventData::RoundOpened { player_id, cards }));
        Ok(())
    }

    fn take_pending(&mut self, player_id: PlayerId, action: &Action) -> Result<(usize, ItemId), RunError> {
        let player_index = self.active_round(player_id, action)?;
        let pending = self
            .state
            .draft
            .as_ref()
            .and_then(|d| d.pending_stratagem.clone())
            .ok_or(RunError::NoPendingReplacement)?;
        Ok((player_index, pending))
    }

    fn replace_stratagem(&mut self, player_id: PlayerId, slot: usize, action: &Action) -> Result<(), RunError> {
        let (player_index, new_item) = self.take_pending(player_id, action)?;
        let player = self
            .state
            .players
            .get_mut(player_index)
            .ok_or(RunError::UnknownPlayer(player_id))?;
        let old_item = LoadoutManager::new(player).replace_stratagem(slot, new_item.clone())?;

        self.emit(RunEvent::new(RunEventData::StratagemReplaced {
            player_id,
            slot,
            old_item,
            new_item,
        }));
        self.advance_round();
        Ok(())
    }

    fn cancel_replacement(&mut self, player_id: PlayerId, action: &Action) -> Result<(), RunError> {
        let (_, item_id) = self.take_pending(player_id, action)?;
        self.emit(RunEvent::new(RunEventData::ReplacementCancelled { player_id, item_id }));
        self.advance_round();
        Ok(())
    }

    // =========================================================================
    // SLOT LOCKS
    // =========================================================================

    fn lock_slot(&mut self, player_id: PlayerId, slot: SlotKind, action: &Action) -> Result<(), RunError> {
        self.require(self.state.phase.in_run(), action)?;

        let RunState { players, requisition, rules, .. } = &mut *self.state;
        let player = players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(RunError::UnknownPlayer(player_id))?;
        LoadoutManager::new(player).lock_slot(slot, requisition, rules)?;

        self.emit(RunEvent::new(RunEventData::SlotLocked { player_id, slot }));
        Ok(())
    }

    fn unlock_slot(&mut self, player_id: PlayerId, slot: SlotKind, action: &Action) -> Result<(), RunError> {
        self.require(self.state.phase.in_run(), action)?;
        let player = self.player_mut(player_id)?;
        LoadoutManager::new(player).unlock_slot(slot)?;

        self.emit(RunEvent::new(RunEventData::SlotUnlocked { player_id, slot }));
        Ok(())
    }
}
