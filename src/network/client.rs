//! Relay Client
//!
//! Opens a [`Link`] over a WebSocket connection to a relay server. The
//! relay routes each connection by the session id of its first message,
//! so `connect` sends that message during setup.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::network::channel::Link;
use crate::network::protocol::{session_tag, ChannelMessage};
use crate::network::session::SyncError;

const LINK_BUFFER: usize = 64;

/// Connect to a relay and join the session named by `first`.
pub async fn connect(url: &str, first: &ChannelMessage) -> Result<Link, SyncError> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| SyncError::PeerUnreachable(e.to_string()))?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let hello = first.to_json().map_err(|e| SyncError::Decode(e.to_string()))?;
    ws_sender
        .send(Message::Text(hello))
        .await
        .map_err(|e| SyncError::PeerUnreachable(e.to_string()))?;

    info!(url, session = %session_tag(&first.session_id()), "Connected to relay");

    let (out_tx, mut out_rx) = mpsc::channel::<String>(LINK_BUFFER);
    let (in_tx, in_rx) = mpsc::channel::<String>(LINK_BUFFER);

    tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let reader = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if in_tx.send(text).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Relay closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Relay connection error");
                    break;
                }
            }
        }
    });

    Ok(Link::from_parts(out_tx, in_rx, reader))
}
