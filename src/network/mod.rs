//! Network Layer
//!
//! Host-authoritative replication of a run between players.
//! This layer is **non-deterministic** - all game logic runs through `game/`.
//!
//! - `protocol`: Channel message types
//! - `session`: Sans-IO host and guest replication state
//! - `channel`: Topic broadcast links and the in-process hub
//! - `client`: Links over a WebSocket relay
//! - `server`: The WebSocket relay
//! - `peer`: Async drivers binding sessions to links

pub mod protocol;
pub mod session;
pub mod channel;
pub mod client;
pub mod server;
pub mod peer;

pub use protocol::{ChannelMessage, IntentEnvelope, SessionId, SnapshotEnvelope};
pub use session::{ConnectionState, GuestEvent, GuestSession, HostSession, SessionConfig, SyncError};
pub use channel::{ChannelHub, Link};
pub use server::{RelayError, RelayServer, ServerConfig};
pub use peer::{GuestPeer, HostPeer, PeerError, SessionView};
