//! Session Replication
//!
//! Host-authoritative replication of a run, without any I/O. The host is
//! the single writer: it reduces intents in arrival order and broadcasts
//! the resulting state with a revision counter. Guests never apply
//! anything locally; their state is a read-only projection of the last
//! accepted snapshot.
//!
//! Both sides take `now` as an argument so presence timeouts are testable
//! without a clock.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::core::rng::derive_run_seed;
use crate::game::action::Action;
use crate::game::error::RunError;
use crate::game::item::Catalog;
use crate::game::reducer::{reduce, Reduction};
use crate::game::rules::RunRules;
use crate::game::state::{GameConfig, Phase, PlayerId, RunState};
use crate::network::protocol::{
    session_tag, ChannelMessage, IntentEnvelope, SessionId, SnapshotEnvelope,
};

/// Replication errors. Handled inside the network layer; never reach the
/// reducer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Snapshot older than the one already held.
    #[error("stale snapshot: revision {incoming} < local {local}")]
    StaleSnapshot {
        /// Revision received
        incoming: u64,
        /// Revision held
        local: u64,
    },

    /// Publishing to the channel failed.
    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),

    /// Message addressed to another session.
    #[error("message for another session")]
    WrongSession,

    /// Snapshot digest does not match its state.
    #[error("snapshot {revision} failed hash verification")]
    HashMismatch {
        /// Offending revision
        revision: u64,
    },

    /// Message could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Timing for presence tracking.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often peers announce themselves.
    pub heartbeat_interval: Duration,
    /// Silence after which a peer counts as gone.
    pub heartbeat_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(2),
            heartbeat_timeout: Duration::from_secs(10),
        }
    }
}

/// Presence of a guest, as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Heard from recently.
    Connected {
        /// Last message time.
        last_seen: Instant,
    },
    /// Timed out or left.
    Disconnected,
}

// =============================================================================
// HOST
// =============================================================================

/// The authoritative side of a session.
pub struct HostSession {
    session_id: SessionId,
    host_id: PlayerId,
    state: RunState,
    revision: u64,
    catalog: Arc<Catalog>,
    presence: BTreeMap<PlayerId, ConnectionState>,
    config: SessionConfig,
}

impl HostSession {
    /// Wrap an existing state.
    pub fn new(
        session_id: SessionId,
        host_id: PlayerId,
        state: RunState,
        catalog: Arc<Catalog>,
        config: SessionConfig,
    ) -> Self {
        Self {
            session_id,
            host_id,
            state,
            revision: 0,
            catalog,
            presence: BTreeMap::new(),
            config,
        }
    }

    /// Open a lobby with the host as its first player.
    pub fn open_lobby(
        session_id: SessionId,
        host_id: PlayerId,
        host_name: &str,
        mut game_config: GameConfig,
        rules: RunRules,
        catalog: Arc<Catalog>,
        config: SessionConfig,
    ) -> Result<Self, RunError> {
        game_config.multiplayer = true;
        let mut session = Self::new(
            session_id,
            host_id,
            RunState::new(game_config, rules),
            catalog,
            config,
        );
        session.apply(&Action::SetPhase(Phase::Lobby))?;
        session.apply(&Action::JoinLobby { player_id: host_id, name: host_name.to_string() })?;

        info!(session = %session_tag(&session_id), "Lobby opened");
        Ok(session)
    }

    /// Session identifier.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Authoritative state.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Current revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Presence of a guest.
    pub fn presence(&self, player_id: &PlayerId) -> Option<ConnectionState> {
        self.presence.get(player_id).copied()
    }

    /// Current snapshot message.
    pub fn snapshot(&self) -> Option<ChannelMessage> {
        match self.state.compute_hash() {
            Ok(state_hash) => Some(ChannelMessage::Snapshot(SnapshotEnvelope {
                session_id: self.session_id,
                revision: self.revision,
                state: self.state.clone(),
                state_hash,
            })),
            Err(e) => {
                error!(error = %e, "Failed to digest run state");
                None
            }
        }
    }

    /// Reduce an action. Returns whether the state changed; the revision
    /// moves only when it did.
    fn apply(&mut self, action: &Action) -> Result<bool, RunError> {
        let reduction = reduce(&self.state, action, &self.catalog);
        self.commit(reduction)
    }

    /// Adopt a reduction's state, bumping the revision if it changed.
    fn commit(&mut self, reduction: Reduction) -> Result<bool, RunError> {
        if let Some(err) = reduction.error {
            return Err(err);
        }

        for event in &reduction.events {
            debug!(event = ?event.data, "Run event");
        }

        if reduction.state == self.state {
            return Ok(false);
        }
        self.state = reduction.state;
        self.revision += 1;
        Ok(true)
    }

    fn broadcast_if(&self, changed: bool) -> Vec<ChannelMessage> {
        if changed {
            self.snapshot().into_iter().collect()
        } else {
            Vec::new()
        }
    }

    /// Apply the host's own action and produce the broadcast.
    pub fn dispatch_local(&mut self, action: &Action) -> Result<Vec<ChannelMessage>, RunError> {
        // Seed a multiplayer run from its lobby when no seed was chosen.
        // Both steps reduce off to the side so a refused start commits nothing.
        if matches!(action, Action::StartRun) && self.state.config.seed == 0 {
            let mut player_ids: Vec<[u8; 16]> = self.state.players.iter().map(|p| p.id.0).collect();
            player_ids.sort();
            let mut config = self.state.config.clone();
            config.seed = derive_run_seed(&self.session_id, &player_ids);

            let seeded = reduce(&self.state, &Action::SetGameConfig(config), &self.catalog);
            if let Some(err) = seeded.error {
                return Err(err);
            }
            let started = reduce(&seeded.state, action, &self.catalog);
            let changed = self.commit(started)?;
            return Ok(self.broadcast_if(changed));
        }

        let changed = self.apply(action)?;
        Ok(self.broadcast_if(changed))
    }

    /// Whether `sender` may issue `action`.
    fn authorize(&self, sender: PlayerId, action: &Action) -> Result<(), RunError> {
        if sender == self.host_id {
            return Ok(());
        }
        match action {
            Action::CancelRun | Action::Unknown => Ok(()),
            _ if action.actor() == Some(sender) => Ok(()),
            _ => Err(RunError::Forbidden),
        }
    }

    fn touch(&mut self, player_id: PlayerId, now: Instant) -> bool {
        let was = self.presence.insert(player_id, ConnectionState::Connected { last_seen: now });
        !matches!(was, Some(ConnectionState::Connected { .. }))
    }

    fn rejected(&self, player_id: PlayerId, error: RunError) -> ChannelMessage {
        ChannelMessage::Rejected {
            session_id: self.session_id,
            player_id,
            revision: self.revision,
            error,
        }
    }

    /// Mark a known player connected or not, if that changes anything.
    fn set_connected(&mut self, player_id: PlayerId, connected: bool) -> bool {
        let known = self
            .state
            .player(&player_id)
            .is_some_and(|p| p.is_connected != connected);
        known
            && self
                .apply(&Action::SetPlayerConnected { player_id, connected })
                .unwrap_or(false)
    }

    /// Handle one inbound channel message.
    pub fn handle(&mut self, msg: ChannelMessage, now: Instant) -> Vec<ChannelMessage> {
        if msg.session_id() != self.session_id {
            debug!(kind = msg.kind(), "Ignoring message for another session");
            return Vec::new();
        }
        if msg.origin() == Some(self.host_id) {
            return Vec::new();
        }

        match msg {
            ChannelMessage::Join { player_id, name, .. } => {
                self.touch(player_id, now);
                if self.state.player(&player_id).is_some() {
                    self.set_connected(player_id, true);
                } else if self.state.phase == Phase::Lobby {
                    let join = Action::JoinLobby { player_id, name: name.clone() };
                    if let Err(e) = self.apply(&join) {
                        return vec![self.rejected(player_id, e)];
                    }
                } else {
                    warn!(player = %player_id, "Join refused: run already started");
                    return vec![self.rejected(player_id, RunError::UnknownPlayer(player_id))];
                }

                info!(player = %player_id, name = %name, "Player joined session");
                // The joiner always needs a full snapshot
                self.snapshot().into_iter().collect()
            }

            ChannelMessage::Heartbeat { player_id, .. } => {
                self.touch(player_id, now);
                let changed = self.set_connected(player_id, true);
                self.broadcast_if(changed)
            }

            ChannelMessage::SyncRequest { player_id, .. } => {
                self.touch(player_id, now);
                self.set_connected(player_id, true);
                self.snapshot().into_iter().collect()
            }

            ChannelMessage::Leave { player_id, .. } => {
                self.presence.insert(player_id, ConnectionState::Disconnected);
                let changed = if self.state.phase == Phase::Lobby {
                    self.apply(&Action::LeaveLobby { player_id }).unwrap_or(false)
                } else {
                    self.set_connected(player_id, false)
                };
                info!(player = %player_id, "Player left session");
                self.broadcast_if(changed)
            }

            ChannelMessage::Intent(IntentEnvelope { player_id, action, .. }) => {
                self.touch(player_id, now);
                let outcome = self
                    .authorize(player_id, &action)
                    .and_then(|_| self.apply(&action));

                match outcome {
                    Ok(changed) => self.broadcast_if(changed),
                    Err(e) => {
                        debug!(player = %player_id, action = action.name(), error = %e, "Intent rejected");
                        vec![self.rejected(player_id, e)]
                    }
                }
            }

            ChannelMessage::Snapshot(envelope) => {
                warn!(revision = envelope.revision, "Ignoring snapshot from another writer");
                Vec::new()
            }

            ChannelMessage::Rejected { .. } | ChannelMessage::SessionEnded { .. } => Vec::new(),
        }
    }

    /// Time out silent guests. Returns the broadcast, if anything changed.
    pub fn check_presence(&mut self, now: Instant) -> Vec<ChannelMessage> {
        let timeout = self.config.heartbeat_timeout;
        let silent: Vec<PlayerId> = self
            .presence
            .iter()
            .filter_map(|(id, presence)| match presence {
                ConnectionState::Connected { last_seen }
                    if now.saturating_duration_since(*last_seen) > timeout =>
                {
                    Some(*id)
                }
                _ => None,
            })
            .collect();

        let mut changed = false;
        for player_id in silent {
            warn!(player = %player_id, "Player timed out");
            self.presence.insert(player_id, ConnectionState::Disconnected);
            changed |= self.set_connected(player_id, false);
        }
        self.broadcast_if(changed)
    }

    /// Periodic keep-alive: the current snapshot at the current revision.
    pub fn heartbeat(&self) -> Option<ChannelMessage> {
        self.snapshot()
    }

    /// Closing message.
    pub fn end(&self, reason: &str) -> ChannelMessage {
        ChannelMessage::SessionEnded {
            session_id: self.session_id,
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// GUEST
// =============================================================================

/// What a guest learned from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestEvent {
    /// Projection replaced.
    StateUpdated {
        /// Revision now held
        revision: u64,
    },
    /// The host refused one of our intents.
    Rejected(RunError),
    /// The host closed the session.
    Ended {
        /// Host's reason
        reason: String,
    },
    /// Nothing for us.
    Ignored,
}

/// A guest's read-only view of a session.
pub struct GuestSession {
    session_id: SessionId,
    player_id: PlayerId,
    name: String,
    state: Option<RunState>,
    revision: u64,
    host_last_seen: Instant,
    ended: bool,
    config: SessionConfig,
}

impl GuestSession {
    /// New guest; the host is considered alive from `now`.
    pub fn new(
        session_id: SessionId,
        player_id: PlayerId,
        name: &str,
        config: SessionConfig,
        now: Instant,
    ) -> Self {
        Self {
            session_id,
            player_id,
            name: name.to_string(),
            state: None,
            revision: 0,
            host_last_seen: now,
            ended: false,
            config,
        }
    }

    /// Our player id.
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Last accepted state.
    pub fn state(&self) -> Option<&RunState> {
        self.state.as_ref()
    }

    /// Revision of the last accepted state.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the host closed the session.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Announce ourselves.
    pub fn join_message(&self) -> ChannelMessage {
        ChannelMessage::Join {
            session_id: self.session_id,
            player_id: self.player_id,
            name: self.name.clone(),
        }
    }

    /// Presence ping.
    pub fn heartbeat(&self) -> ChannelMessage {
        ChannelMessage::Heartbeat { session_id: self.session_id, player_id: self.player_id }
    }

    /// Ask for a fresh snapshot.
    pub fn sync_request(&self) -> ChannelMessage {
        ChannelMessage::SyncRequest { session_id: self.session_id, player_id: self.player_id }
    }

    /// Say goodbye.
    pub fn leave(&self) -> ChannelMessage {
        ChannelMessage::Leave { session_id: self.session_id, player_id: self.player_id }
    }

    /// Wrap an action for the host. Nothing is applied locally.
    pub fn intent(&self, action: Action) -> ChannelMessage {
        ChannelMessage::Intent(IntentEnvelope {
            session_id: self.session_id,
            player_id: self.player_id,
            action,
        })
    }

    /// Whether the host has been silent past the timeout.
    pub fn host_timed_out(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.host_last_seen) > self.config.heartbeat_timeout
    }

    /// Apply one inbound message to the projection.
    pub fn receive(&mut self, msg: ChannelMessage, now: Instant) -> Result<GuestEvent, SyncError> {
        if msg.session_id() != self.session_id {
            return Err(SyncError::WrongSession);
        }

        match msg {
            ChannelMessage::Snapshot(envelope) => {
                if self.state.is_some() && envelope.revision < self.revision {
                    return Err(SyncError::StaleSnapshot {
                        incoming: envelope.revision,
                        local: self.revision,
                    });
                }

                let digest = envelope
                    .state
                    .compute_hash()
                    .map_err(|e| SyncError::Decode(e.to_string()))?;
                if digest != envelope.state_hash {
                    return Err(SyncError::HashMismatch { revision: envelope.revision });
                }

                self.host_last_seen = now;
                self.revision = envelope.revision;
                self.state = Some(envelope.state);
                Ok(GuestEvent::StateUpdated { revision: self.revision })
            }

            ChannelMessage::Rejected { player_id, error, .. } if player_id == self.player_id => {
                self.host_last_seen = now;
                Ok(GuestEvent::Rejected(error))
            }

            ChannelMessage::SessionEnded { reason, .. } => {
                self.ended = true;
                Ok(GuestEvent::Ended { reason })
            }

            _ => Ok(GuestEvent::Ignored),
        }
    }
}
