//! WebSocket Relay Server
//!
//! Stands in for a hosted realtime channel service. Each connection is
//! routed to a session topic by the session id of its first message, and
//! every later message is fanned out to the other connections on that
//! topic. The relay never interprets game state: the session host stays
//! authoritative.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, sleep_until, timeout, Instant};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::game::state::PlayerId;
use crate::network::channel::ChannelHub;
use crate::network::protocol::{session_tag, ChannelMessage, SessionId};

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Connections silent this long are closed.
    pub idle_timeout: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(30),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `HELLDRAFT_BIND`, `HELLDRAFT_MAX_CONNECTIONS`
    /// and `HELLDRAFT_IDLE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, RelayError> {
        let mut config = Self::default();

        if let Ok(bind) = std::env::var("HELLDRAFT_BIND") {
            config.bind_addr = bind
                .parse()
                .map_err(|e| RelayError::Config(format!("HELLDRAFT_BIND: {}", e)))?;
        }
        if let Ok(max) = std::env::var("HELLDRAFT_MAX_CONNECTIONS") {
            config.max_connections = max
                .parse()
                .map_err(|e| RelayError::Config(format!("HELLDRAFT_MAX_CONNECTIONS: {}", e)))?;
        }
        if let Ok(secs) = std::env::var("HELLDRAFT_IDLE_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| RelayError::Config(format!("HELLDRAFT_IDLE_TIMEOUT_SECS: {}", e)))?;
            config.idle_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// Relay errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Bad configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// What the relay knows about a connection.
#[derive(Debug, Clone, Default)]
struct ConnectedClient {
    /// Topic, once the first message arrived.
    session_id: Option<SessionId>,
}

/// The relay server.
pub struct RelayServer {
    config: ServerConfig,
    hub: ChannelHub,
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RelayServer {
    /// Create a new relay.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            hub: ChannelHub::new(),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, RelayError> {
        Ok(TcpListener::bind(&self.config.bind_addr).await?)
    }

    /// Bind and serve until shutdown.
    pub async fn run(&self) -> Result<(), RelayError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve connections from `listener` until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), RelayError> {
        info!("Relay listening on {}", listener.local_addr()?);

        let cleanup_hub = self.hub.clone();
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_hub).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();
        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let hub = self.hub.clone();
        let idle_timeout = self.config.idle_timeout;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };
            let (mut ws_sender, mut ws_receiver) = ws_stream.split();

            clients.write().await.insert(addr, ConnectedClient::default());

            // The first message names the topic
            let first = match timeout(idle_timeout, ws_receiver.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => ChannelMessage::from_json(&text).ok(),
                _ => None,
            };
            let Some(first) = first else {
                debug!("Client {} sent no usable greeting", addr);
                clients.write().await.remove(&addr);
                return;
            };

            let session_id = first.session_id();
            let tag = session_tag(&session_id);
            let mut player_id = first.origin();
            {
                let mut clients = clients.write().await;
                if let Some(client) = clients.get_mut(&addr) {
                    client.session_id = Some(session_id);
                }
            }

            let mut link = hub.join(session_id).await;
            if let Err(e) = link.publish(&first).await {
                warn!(session = %tag, error = %e, "Failed to forward greeting");
            }
            info!(session = %tag, "Client {} joined", addr);

            let mut deadline = Instant::now() + idle_timeout;

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                deadline = Instant::now() + idle_timeout;
                                let msg = match ChannelMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        continue;
                                    }
                                };
                                if msg.session_id() != session_id {
                                    debug!("Client {} wrote to a foreign session", addr);
                                    continue;
                                }
                                if player_id.is_none() {
                                    player_id = msg.origin();
                                }
                                if link.publish(&msg).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            Some(Ok(_)) => {
                                deadline = Instant::now() + idle_timeout;
                            }
                        }
                    }
                    relayed = link.recv() => {
                        let Some(msg) = relayed else { break };
                        let text = match msg.to_json() {
                            Ok(t) => t,
                            Err(e) => {
                                error!("Failed to serialize message: {}", e);
                                continue;
                            }
                        };
                        if ws_sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    _ = sleep_until(deadline) => {
                        info!(session = %tag, "Closing idle client {}", addr);
                        break;
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            // Tell the session a guest dropped
            if let Some(player_id) = player_id {
                let leave = ChannelMessage::Leave { session_id, player_id };
                let _ = link.publish(&leave).await;
            }

            clients.write().await.remove(&addr);
            info!(session = %tag, "Client {} cleaned up", addr);
        });
    }

    /// Periodically drop empty topics.
    async fn run_cleanup_loop(hub: ChannelHub) {
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;
            let pruned = hub.prune().await;
            if pruned > 0 {
                debug!(pruned, "Pruned empty topics");
            }
        }
    }

    /// Shutdown the relay.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Connections routed to a session.
    pub async fn session_connection_count(&self, session_id: &SessionId) -> usize {
        self.clients
            .read()
            .await
            .values()
            .filter(|c| c.session_id.as_ref() == Some(session_id))
            .count()
    }

    /// Get live topic count.
    pub async fn topic_count(&self) -> usize {
        self.hub.topic_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::client::connect;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = RelayServer::new(config);

        assert_eq!(server.connection_count().await, 0);
        assert_eq!(server.topic_count().await, 0);
    }

    #[tokio::test]
    async fn test_relay_routes_and_announces_leave() {
        let server = Arc::new(RelayServer::new(ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        }));
        let listener = server.bind().await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let serving = server.clone();
        tokio::spawn(async move { serving.serve(listener).await });

        let session_id = [4; 16];
        let host_id = PlayerId::new([1; 16]);
        let guest_id = PlayerId::new([2; 16]);

        let mut host = connect(&url, &ChannelMessage::SyncRequest { session_id, player_id: host_id })
            .await
            .unwrap();
        // Give the relay a moment to subscribe the host
        tokio::time::sleep(Duration::from_millis(50)).await;

        let join = ChannelMessage::Join { session_id, player_id: guest_id, name: "Guest".into() };
        let guest = connect(&url, &join).await.unwrap();

        let received = timeout(Duration::from_secs(2), host.recv()).await.unwrap();
        assert_eq!(received, Some(join));
        assert_eq!(server.session_connection_count(&session_id).await, 2);

        drop(guest);
        let received = timeout(Duration::from_secs(2), host.recv()).await.unwrap();
        assert_eq!(received, Some(ChannelMessage::Leave { session_id, player_id: guest_id }));

        server.shutdown();
    }
}
