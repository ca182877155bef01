//! Run Errors
//!
//! Everything the reducer can refuse. Reducer errors never escape as
//! panics: a rejected action leaves the state unchanged and carries one of
//! these as its marker. Serializable so a host can tell a guest why.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::item::ItemId;
use crate::game::loadout::SlotKind;
use crate::game::state::{Phase, PlayerId};

/// Reasons an action was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RunError {
    /// Not enough shared requisition.
    #[error("insufficient requisition: need {required}, have {available}")]
    InsufficientRequisition {
        /// Cost of the action
        required: u32,
        /// Requisition held
        available: u32,
    },

    /// Player already holds the maximum number of locks.
    #[error("slot lock limit reached ({max})")]
    SlotLimitReached {
        /// Configured maximum
        max: usize,
    },

    /// Slot is already locked.
    #[error("slot {0:?} is already locked")]
    AlreadyLocked(SlotKind),

    /// Slot is not locked.
    #[error("slot {0:?} is not locked")]
    NotLocked(SlotKind),

    /// Action is not legal in the current phase.
    #[error("{action} is not allowed in phase {from:?}")]
    InvalidTransition {
        /// Phase the run was in
        from: Phase,
        /// Name of the refused action
        action: String,
    },

    /// Draft requested against zero eligible candidates.
    #[error("no eligible cards to draw")]
    EmptyPool,

    /// Player id is not part of the run.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// Another player is drafting.
    #[error("player {0} is not the active drafter")]
    NotActivePlayer(PlayerId),

    /// No draft round is open.
    #[error("no draft round is open")]
    NoActiveRound,

    /// Card index outside the offered hand.
    #[error("card {index} out of range for a hand of {len}")]
    CardOutOfRange {
        /// Requested index
        index: usize,
        /// Cards offered
        len: usize,
    },

    /// A stratagem replacement must be resolved first.
    #[error("a stratagem replacement is pending")]
    ReplacementPending,

    /// No stratagem replacement is pending.
    #[error("no stratagem replacement is pending")]
    NoPendingReplacement,

    /// Slot does not exist.
    #[error("invalid slot {0:?}")]
    InvalidSlot(SlotKind),

    /// Stratagem is already equipped in another slot.
    #[error("stratagem {0} is already equipped")]
    DuplicateStratagem(ItemId),

    /// Loadout references missing or mistyped items.
    #[error("invalid loadout: {0}")]
    InvalidLoadout(String),

    /// Difficulty outside 1..=max.
    #[error("invalid difficulty {0}")]
    InvalidDifficulty(u8),

    /// Players still owe item sacrifices.
    #[error("item sacrifices are still pending")]
    SacrificePending,

    /// Player owes no sacrifice.
    #[error("player {0} owes no sacrifice")]
    NoSacrificeOwed(PlayerId),

    /// Locked slots are exempt from sacrifice.
    #[error("slot {0:?} is locked")]
    SlotLocked(SlotKind),

    /// Slot holds nothing.
    #[error("slot {0:?} is empty")]
    SlotEmpty(SlotKind),

    /// Sender may not issue this action.
    #[error("action not permitted for this peer")]
    Forbidden,
}
