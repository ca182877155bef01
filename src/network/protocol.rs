//! Protocol Messages
//!
//! Wire format for peers sharing a session over the realtime channel.
//! All messages are serialized as JSON; every peer on a session topic sees
//! every message and filters what concerns it.
//!
//! ## Flow
//!
//! ```text
//! guest ── Join / Heartbeat / Intent / SyncRequest / Leave ──► host
//! host  ── Snapshot (all) / Rejected (origin) / SessionEnded ──► guests
//! ```

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHash;
use crate::game::action::Action;
use crate::game::error::RunError;
use crate::game::state::{PlayerId, RunState};

/// Unique session identifier; also the channel topic.
pub type SessionId = [u8; 16];

/// Fresh random session id.
pub fn new_session_id() -> SessionId {
    *uuid::Uuid::new_v4().as_bytes()
}

/// Short hex form of a session id for logs.
pub fn session_tag(session_id: &SessionId) -> String {
    hex::encode(&session_id[..4])
}

// =============================================================================
// ENVELOPES
// =============================================================================

/// A guest's request for the host to apply an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentEnvelope {
    /// Session the intent belongs to.
    pub session_id: SessionId,
    /// Sending player.
    pub player_id: PlayerId,
    /// Requested action.
    pub action: Action,
}

/// The host's authoritative state at a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    /// Session the snapshot belongs to.
    pub session_id: SessionId,
    /// Host revision counter.
    pub revision: u64,
    /// Full run state.
    pub state: RunState,
    /// Digest of `state`.
    pub state_hash: StateHash,
}

// =============================================================================
// CHANNEL MESSAGES
// =============================================================================

/// Everything that travels on a session topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    /// Guest announces itself.
    Join {
        /// Session to join.
        session_id: SessionId,
        /// Joining player.
        player_id: PlayerId,
        /// Display name.
        name: String,
    },

    /// Guest presence ping.
    Heartbeat {
        /// Session.
        session_id: SessionId,
        /// Sending player.
        player_id: PlayerId,
    },

    /// Guest is leaving.
    Leave {
        /// Session.
        session_id: SessionId,
        /// Leaving player.
        player_id: PlayerId,
    },

    /// Guest asks for the current snapshot.
    SyncRequest {
        /// Session.
        session_id: SessionId,
        /// Requesting player.
        player_id: PlayerId,
    },

    /// Guest intent.
    Intent(IntentEnvelope),

    /// Host state broadcast.
    Snapshot(SnapshotEnvelope),

    /// Host refused an intent.
    Rejected {
        /// Session.
        session_id: SessionId,
        /// Player whose intent was refused.
        player_id: PlayerId,
        /// Host revision at the time (unchanged by the refusal).
        revision: u64,
        /// Why.
        error: RunError,
    },

    /// Host closed the session.
    SessionEnded {
        /// Session.
        session_id: SessionId,
        /// Human-readable reason.
        reason: String,
    },
}

impl ChannelMessage {
    /// Session the message belongs to.
    pub fn session_id(&self) -> SessionId {
        match self {
            ChannelMessage::Join { session_id, .. }
            | ChannelMessage::Heartbeat { session_id, .. }
            | ChannelMessage::Leave { session_id, .. }
            | ChannelMessage::SyncRequest { session_id, .. }
            | ChannelMessage::Rejected { session_id, .. }
            | ChannelMessage::SessionEnded { session_id, .. } => *session_id,
            ChannelMessage::Intent(envelope) => envelope.session_id,
            ChannelMessage::Snapshot(envelope) => envelope.session_id,
        }
    }

    /// Guest that sent the message, for guest-originated messages.
    pub fn origin(&self) -> Option<PlayerId> {
        match self {
            ChannelMessage::Join { player_id, .. }
            | ChannelMessage::Heartbeat { player_id, .. }
            | ChannelMessage::Leave { player_id, .. }
            | ChannelMessage::SyncRequest { player_id, .. } => Some(*player_id),
            ChannelMessage::Intent(envelope) => Some(envelope.player_id),
            _ => None,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelMessage::Join { .. } => "join",
            ChannelMessage::Heartbeat { .. } => "heartbeat",
            ChannelMessage::Leave { .. } => "leave",
            ChannelMessage::SyncRequest { .. } => "sync_request",
            ChannelMessage::Intent(_) => "intent",
            ChannelMessage::Snapshot(_) => "snapshot",
            ChannelMessage::Rejected { .. } => "rejected",
            ChannelMessage::SessionEnded { .. } => "session_ended",
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::loadout::SlotKind;

    #[test]
    fn test_intent_json_roundtrip() {
        let msg = ChannelMessage::Intent(IntentEnvelope {
            session_id: [3; 16],
            player_id: PlayerId::new([1; 16]),
            action: Action::LockSlot {
                player_id: PlayerId::new([1; 16]),
                slot: SlotKind::Stratagem(2),
            },
        });

        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"intent\""));
        let parsed = ChannelMessage::from_json(&json).unwrap();
        assert_eq!(parsed, msg);
        assert_eq!(parsed.origin(), Some(PlayerId::new([1; 16])));
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let state = RunState::default();
        let msg = ChannelMessage::Snapshot(SnapshotEnvelope {
            session_id: [9; 16],
            revision: 12,
            state_hash: state.compute_hash().unwrap(),
            state,
        });

        let parsed = ChannelMessage::from_json(&msg.to_json().unwrap()).unwrap();
        match parsed {
            ChannelMessage::Snapshot(envelope) => {
                assert_eq!(envelope.revision, 12);
                assert_eq!(envelope.state.compute_hash().unwrap(), envelope.state_hash);
            }
            other => panic!("Wrong message type: {}", other.kind()),
        }
    }

    #[test]
    fn test_rejection_carries_error() {
        let msg = ChannelMessage::Rejected {
            session_id: [1; 16],
            player_id: PlayerId::new([2; 16]),
            revision: 4,
            error: RunError::AlreadyLocked(SlotKind::Armor),
        };
        let parsed = ChannelMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed, msg);
        assert_eq!(parsed.session_id(), [1; 16]);
        assert_eq!(parsed.origin(), None);
    }

    #[test]
    fn test_session_tag_is_short_hex() {
        assert_eq!(session_tag(&[0xab; 16]), "abababab");
    }
}
