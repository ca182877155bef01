//! # Helldraft Core
//!
//! Run logic for Helldraft, a roguelite card-drafting layer on top of
//! squad missions: players draft loadout items between missions, spend
//! shared requisition on rerolls and slot locks, and push up the
//! difficulty ladder until victory or defeat.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HELLDRAFT CORE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Xorshift128+ PRNG, run seed derivation    │
//! │  └── hash.rs     - State digests                             │
//! │                                                              │
//! │  game/           - Run logic (deterministic)                 │
//! │  ├── item.rs     - Item catalog                              │
//! │  ├── armor.rs    - Armor combo index                         │
//! │  ├── rules.rs    - Balance table                             │
//! │  ├── loadout.rs  - Slots, locks, stratagem replacement       │
//! │  ├── state.rs    - Run and player state                      │
//! │  ├── draft.rs    - Weighted draft engine                     │
//! │  ├── mission.rs  - Mission outcomes                          │
//! │  └── reducer.rs  - reduce(state, action)                     │
//! │                                                              │
//! │  network/        - Replication (non-deterministic)           │
//! │  ├── protocol.rs - Channel messages                          │
//! │  ├── session.rs  - Host / guest replication state            │
//! │  ├── channel.rs  - Topic broadcast links                     │
//! │  ├── peer.rs     - Async session drivers                     │
//! │  └── server.rs   - WebSocket relay                           │
//! │                                                              │
//! │  store/          - Saved runs                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from the seeded Xorshift128+ carried in `RunState`
//!
//! The same state and the same action always reduce to the same state,
//! which is what lets a host replicate runs by snapshot and lets a saved
//! run resume exactly.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod store;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use game::action::Action;
pub use game::item::Catalog;
pub use game::reducer::{reduce, Reduction};
pub use game::state::{Phase, PlayerId, RunState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
