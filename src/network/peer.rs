//! Session Peers
//!
//! Async drivers that bind a [`HostSession`] or [`GuestSession`] to a
//! [`Link`]. Each peer runs as one task; the presentation layer talks to
//! it through a handle and watches a [`SessionView`].

use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::game::action::Action;
use crate::game::error::RunError;
use crate::game::state::RunState;
use crate::network::channel::Link;
use crate::network::protocol::ChannelMessage;
use crate::network::session::{GuestEvent, GuestSession, HostSession, SessionConfig, SyncError};

/// Errors surfaced to a peer's handle.
#[derive(Debug, Error)]
pub enum PeerError {
    /// The host refused the action.
    #[error(transparent)]
    Run(#[from] RunError),

    /// Replication failure.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The peer task has stopped.
    #[error("peer task stopped")]
    Closed,
}

/// What a peer currently knows about its session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionView {
    /// Revision of `state`.
    pub revision: u64,
    /// Latest state, once any is known.
    pub state: Option<RunState>,
    /// Last rejection of one of our intents.
    pub last_rejection: Option<RunError>,
    /// Host went quiet or the link dropped.
    pub host_lost: bool,
    /// Set once the session is over.
    pub ended: Option<String>,
}

async fn publish_all(link: &Link, msgs: Vec<ChannelMessage>) {
    for msg in msgs {
        if let Err(e) = link.publish(&msg).await {
            warn!(kind = msg.kind(), error = %e, "Publish failed");
        }
    }
}

// =============================================================================
// HOST
// =============================================================================

enum HostCommand {
    Dispatch(Action, oneshot::Sender<Result<u64, RunError>>),
    End(String),
}

/// Handle to a running host.
pub struct HostPeer {
    commands: mpsc::Sender<HostCommand>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<HostSession>,
}

impl HostPeer {
    /// Start driving `session` over `link`.
    pub fn spawn(session: HostSession, link: Link, config: SessionConfig) -> Self {
        let (commands, command_rx) = mpsc::channel(32);
        let (view_tx, view) = watch::channel(Self::view_of(&session));
        let task = tokio::spawn(Self::run(session, link, config, command_rx, view_tx));
        Self { commands, view, task }
    }

    fn view_of(session: &HostSession) -> SessionView {
        SessionView {
            revision: session.revision(),
            state: Some(session.state().clone()),
            ..Default::default()
        }
    }

    /// Apply the host's own action. Returns the new revision.
    pub async fn dispatch(&self, action: Action) -> Result<u64, PeerError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(HostCommand::Dispatch(action, reply))
            .await
            .map_err(|_| PeerError::Closed)?;
        Ok(response.await.map_err(|_| PeerError::Closed)??)
    }

    /// Watch the authoritative state.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// End the session and get the final host state back.
    pub async fn end(self, reason: &str) -> Result<HostSession, PeerError> {
        self.commands
            .send(HostCommand::End(reason.to_string()))
            .await
            .map_err(|_| PeerError::Closed)?;
        self.task.await.map_err(|_| PeerError::Closed)
    }

    async fn run(
        mut session: HostSession,
        mut link: Link,
        config: SessionConfig,
        mut commands: mpsc::Receiver<HostCommand>,
        view: watch::Sender<SessionView>,
    ) -> HostSession {
        let mut heartbeat = interval(config.heartbeat_interval);

        loop {
            let before = session.revision();

            tokio::select! {
                msg = link.recv() => {
                    let Some(msg) = msg else {
                        warn!("Host link closed");
                        break;
                    };
                    let replies = session.handle(msg, Instant::now());
                    publish_all(&link, replies).await;
                }
                command = commands.recv() => {
                    match command {
                        Some(HostCommand::Dispatch(action, reply)) => {
                            let result = session.dispatch_local(&action);
                            match result {
                                Ok(msgs) => {
                                    publish_all(&link, msgs).await;
                                    let _ = reply.send(Ok(session.revision()));
                                }
                                Err(e) => {
                                    debug!(action = action.name(), error = %e, "Host action rejected");
                                    let _ = reply.send(Err(e));
                                }
                            }
                        }
                        Some(HostCommand::End(reason)) => {
                            publish_all(&link, vec![session.end(&reason)]).await;
                            view.send_modify(|v| v.ended = Some(reason));
                            break;
                        }
                        None => break,
                    }
                }
                _ = heartbeat.tick() => {
                    let mut msgs = session.check_presence(Instant::now());
                    if msgs.is_empty() {
                        msgs.extend(session.heartbeat());
                    }
                    publish_all(&link, msgs).await;
                }
            }

            if session.revision() != before {
                let _ = view.send(Self::view_of(&session));
            }
        }

        info!(revision = session.revision(), "Host stopped");
        session
    }
}

// =============================================================================
// GUEST
// =============================================================================

enum GuestCommand {
    Intent(Action),
    Leave,
}

/// Handle to a running guest.
pub struct GuestPeer {
    commands: mpsc::Sender<GuestCommand>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<()>,
}

impl GuestPeer {
    /// Join the session over `link` and start following the host.
    pub fn spawn(session: GuestSession, link: Link, config: SessionConfig) -> Self {
        let (commands, command_rx) = mpsc::channel(32);
        let (view_tx, view) = watch::channel(SessionView::default());
        let task = tokio::spawn(Self::run(session, link, config, command_rx, view_tx));
        Self { commands, view, task }
    }

    /// Send an intent to the host. The result arrives as a new snapshot or
    /// a rejection in the view.
    pub async fn send(&self, action: Action) -> Result<(), PeerError> {
        self.commands
            .send(GuestCommand::Intent(action))
            .await
            .map_err(|_| PeerError::Closed)
    }

    /// Watch the replicated state.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Leave the session.
    pub async fn leave(self) -> Result<(), PeerError> {
        self.commands
            .send(GuestCommand::Leave)
            .await
            .map_err(|_| PeerError::Closed)?;
        self.task.await.map_err(|_| PeerError::Closed)
    }

    async fn run(
        mut session: GuestSession,
        mut link: Link,
        config: SessionConfig,
        mut commands: mpsc::Receiver<GuestCommand>,
        view: watch::Sender<SessionView>,
    ) {
        publish_all(&link, vec![session.join_message()]).await;
        let mut heartbeat = interval(config.heartbeat_interval);

        loop {
            tokio::select! {
                msg = link.recv() => {
                    let Some(msg) = msg else {
                        warn!("Guest link closed");
                        view.send_modify(|v| {
                            v.host_lost = true;
                            v.ended = Some("link closed".to_string());
                        });
                        break;
                    };

                    match session.receive(msg, Instant::now()) {
                        Ok(GuestEvent::StateUpdated { revision }) => {
                            let state = session.state().cloned();
                            view.send_modify(|v| {
                                v.revision = revision;
                                v.state = state;
                            });
                        }
                        Ok(GuestEvent::Rejected(error)) => {
                            view.send_modify(|v| v.last_rejection = Some(error));
                        }
                        Ok(GuestEvent::Ended { reason }) => {
                            info!(reason = %reason, "Host ended the session");
                            view.send_modify(|v| v.ended = Some(reason));
                            break;
                        }
                        Ok(GuestEvent::Ignored) => {}
                        Err(SyncError::HashMismatch { revision }) => {
                            warn!(revision, "Snapshot failed verification, resyncing");
                            publish_all(&link, vec![session.sync_request()]).await;
                        }
                        Err(e) => debug!(error = %e, "Snapshot discarded"),
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(GuestCommand::Intent(action)) => {
                            publish_all(&link, vec![session.intent(action)]).await;
                        }
                        Some(GuestCommand::Leave) | None => {
                            publish_all(&link, vec![session.leave()]).await;
                            break;
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    // No host migration: a silent host ends the session
                    if session.host_timed_out(Instant::now()) {
                        warn!("Host timed out");
                        view.send_modify(|v| {
                            v.host_lost = true;
                            v.ended = Some("host timed out".to_string());
                        });
                        break;
                    }
                    publish_all(&link, vec![session.heartbeat()]).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use crate::game::item::Catalog;
    use crate::game::loadout::SlotKind;
    use crate::game::rules::RunRules;
    use crate::game::state::{GameConfig, Phase, PlayerId};
    use crate::network::channel::ChannelHub;

    const SESSION: [u8; 16] = [8; 16];
    const HOST: PlayerId = PlayerId::new([1; 16]);
    const GUEST: PlayerId = PlayerId::new([2; 16]);

    fn fast_config() -> SessionConfig {
        SessionConfig {
            heartbeat_interval: Duration::from_millis(20),
            heartbeat_timeout: Duration::from_millis(500),
        }
    }

    async fn wait_until(
        rx: &mut watch::Receiver<SessionView>,
        pred: impl FnMut(&SessionView) -> bool,
    ) -> SessionView {
        timeout(Duration::from_secs(2), rx.wait_for(pred))
            .await
            .expect("timed out waiting for view")
            .expect("peer stopped")
            .clone()
    }

    async fn start() -> (HostPeer, GuestPeer) {
        let hub = ChannelHub::new();
        let catalog = Arc::new(Catalog::builtin().unwrap());
        let session = HostSession::open_lobby(
            SESSION,
            HOST,
            "Host",
            GameConfig::default(),
            RunRules::default(),
            catalog,
            fast_config(),
        )
        .unwrap();

        let host = HostPeer::spawn(session, hub.join(SESSION).await, fast_config());
        let guest_session = GuestSession::new(SESSION, GUEST, "Guest", fast_config(), Instant::now());
        let guest = GuestPeer::spawn(guest_session, hub.join(SESSION).await, fast_config());
        (host, guest)
    }

    #[tokio::test]
    async fn test_guest_joins_and_follows_host() {
        let (host, guest) = start().await;
        let mut guest_view = guest.subscribe();

        let view = wait_until(&mut guest_view, |v| {
            v.state.as_ref().is_some_and(|s| s.players.len() == 2)
        })
        .await;
        assert_eq!(view.state.unwrap().phase, Phase::Lobby);

        host.dispatch(Action::StartRun).await.unwrap();
        let view = wait_until(&mut guest_view, |v| {
            v.state.as_ref().is_some_and(|s| s.phase == Phase::Dashboard)
        })
        .await;

        let host_view = host.subscribe().borrow().clone();
        assert_eq!(view.state, host_view.state);
        assert_eq!(view.revision, host_view.revision);
    }

    #[tokio::test]
    async fn test_guest_intent_applied_by_host() {
        let (host, guest) = start().await;
        let mut guest_view = guest.subscribe();
        wait_until(&mut guest_view, |v| {
            v.state.as_ref().is_some_and(|s| s.players.len() == 2)
        })
        .await;

        host.dispatch(Action::StartRun).await.unwrap();
        host.dispatch(Action::SetRequisition(5)).await.unwrap();
        wait_until(&mut guest_view, |v| v.state.as_ref().is_some_and(|s| s.requisition == 5)).await;

        guest
            .send(Action::LockSlot { player_id: GUEST, slot: SlotKind::Primary })
            .await
            .unwrap();
        let view = wait_until(&mut guest_view, |v| {
            v.state.as_ref().is_some_and(|s| s.requisition == 3)
        })
        .await;
        let state = view.state.unwrap();
        assert!(state.player(&GUEST).unwrap().locked_slots.contains(&SlotKind::Primary));
    }

    #[tokio::test]
    async fn test_forbidden_intent_reported() {
        let (host, guest) = start().await;
        let mut guest_view = guest.subscribe();
        wait_until(&mut guest_view, |v| v.state.is_some()).await;

        guest.send(Action::SetLives(99)).await.unwrap();
        let view = wait_until(&mut guest_view, |v| v.last_rejection.is_some()).await;
        assert_eq!(view.last_rejection, Some(RunError::Forbidden));

        let host_view = host.subscribe().borrow().clone();
        assert_ne!(host_view.state.unwrap().lives, 99);
    }

    #[tokio::test]
    async fn test_end_reaches_guest() {
        let (host, guest) = start().await;
        let mut guest_view = guest.subscribe();
        wait_until(&mut guest_view, |v| v.state.is_some()).await;

        let session = host.end("host quit").await.unwrap();
        assert_eq!(session.state().players.len(), 2);

        let view = wait_until(&mut guest_view, |v| v.ended.is_some()).await;
        assert_eq!(view.ended.as_deref(), Some("host quit"));
    }

    #[tokio::test]
    async fn test_silent_host_ends_guest_session() {
        let hub = ChannelHub::new();
        // Nobody is hosting on this topic
        let _silent = hub.join(SESSION).await;
        let guest_session = GuestSession::new(SESSION, GUEST, "Guest", fast_config(), Instant::now());
        let guest = GuestPeer::spawn(guest_session, hub.join(SESSION).await, fast_config());

        let mut view = guest.subscribe();
        let view = wait_until(&mut view, |v| v.ended.is_some()).await;
        assert!(view.host_lost);
        assert!(view.state.is_none());
    }
}
