//! Game Logic Module
//!
//! Everything that decides what a run looks like. 100% deterministic and
//! free of I/O: the network and store layers only move `RunState` values
//! around and feed `Action`s into [`reduce`].
//!
//! ## Module Structure
//!
//! - `item`: Item records and the read-only catalog
//! - `armor`: Armor-combo index derived from the catalog
//! - `rules`: Balance table (costs, limits, weights)
//! - `loadout`: Slots, loadouts, lock economy, stratagem replacement
//! - `state`: Run state, players, phases
//! - `draft`: Eligible pool, exclusions, weighted draws
//! - `mission`: Mission outcomes, lives, sacrifices, difficulty ladder
//! - `action`: The closed intent set
//! - `events`: What each reduction changed
//! - `error`: Rejection reasons
//! - `reducer`: `reduce(state, action)`

pub mod item;
pub mod armor;
pub mod rules;
pub mod loadout;
pub mod state;
pub mod draft;
pub mod mission;
pub mod action;
pub mod events;
pub mod error;
pub mod reducer;

// Re-export key types
pub use item::{Catalog, Item, ItemId, ItemType, Rarity};
pub use armor::{ArmorCombo, ArmorIndex};
pub use rules::RunRules;
pub use loadout::{Loadout, LoadoutManager, SlotKind};
pub use state::{GameConfig, Phase, Player, PlayerId, RunOutcome, RunState};
pub use draft::DraftCard;
pub use mission::MissionReport;
pub use action::Action;
pub use events::RunEvent;
pub use error::RunError;
pub use reducer::{reduce, Reduction};
