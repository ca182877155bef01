//! Realtime Channel
//!
//! Topic-based broadcast between the peers of a session. A [`Link`] is one
//! peer's attachment to a topic: it publishes [`ChannelMessage`]s and
//! receives everyone else's. Links come from the in-process [`ChannelHub`]
//! or from a relay connection (see `client`); peers cannot tell the
//! difference.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::network::protocol::{session_tag, ChannelMessage, SessionId};
use crate::network::session::SyncError;

/// Messages buffered per topic before slow receivers start lagging.
pub const TOPIC_CAPACITY: usize = 256;

/// Messages buffered per link direction.
const LINK_BUFFER: usize = 64;

/// A frame on a topic, tagged with the link that sent it.
#[derive(Debug, Clone)]
struct Frame {
    from: u64,
    text: Arc<str>,
}

/// One peer's attachment to a session topic.
pub struct Link {
    outbound: mpsc::Sender<String>,
    inbound: mpsc::Receiver<String>,
    reader: JoinHandle<()>,
}

impl Link {
    /// Assemble a link. The writer side drains and exits on its own once
    /// `outbound` is dropped; only the reader is aborted.
    pub(crate) fn from_parts(
        outbound: mpsc::Sender<String>,
        inbound: mpsc::Receiver<String>,
        reader: JoinHandle<()>,
    ) -> Self {
        Self { outbound, inbound, reader }
    }

    /// Publish a message to every other peer on the topic.
    pub async fn publish(&self, msg: &ChannelMessage) -> Result<(), SyncError> {
        let text = msg.to_json().map_err(|e| SyncError::Decode(e.to_string()))?;
        self.outbound
            .send(text)
            .await
            .map_err(|_| SyncError::PeerUnreachable("channel closed".to_string()))
    }

    /// Next message from another peer. `None` once the channel is gone.
    /// Undecodable frames are skipped.
    pub async fn recv(&mut self) -> Option<ChannelMessage> {
        loop {
            let text = self.inbound.recv().await?;
            match ChannelMessage::from_json(&text) {
                Ok(msg) => return Some(msg),
                Err(e) => debug!(error = %e, "Dropping undecodable frame"),
            }
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// In-process topic registry.
#[derive(Clone, Default)]
pub struct ChannelHub {
    topics: Arc<RwLock<BTreeMap<SessionId, broadcast::Sender<Frame>>>>,
    next_link: Arc<AtomicU64>,
}

impl ChannelHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new link to `topic`, creating the topic on first use.
    pub async fn join(&self, topic: SessionId) -> Link {
        let sender = {
            let mut topics = self.topics.write().await;
            topics
                .entry(topic)
                .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
                .clone()
        };
        let id = self.next_link.fetch_add(1, Ordering::Relaxed);

        let (out_tx, mut out_rx) = mpsc::channel::<String>(LINK_BUFFER);
        let (in_tx, in_rx) = mpsc::channel::<String>(LINK_BUFFER);

        // Subscribe before spawning so nothing published after join is missed
        let mut subscription = sender.subscribe();
        let tag = session_tag(&topic);

        let reader = tokio::spawn(async move {
            loop {
                match subscription.recv().await {
                    Ok(frame) if frame.from == id => continue,
                    Ok(frame) => {
                        if in_tx.send(frame.text.to_string()).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(topic = %tag, skipped, "Link lagged behind topic");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                // No other subscribers is not an error for a broadcast
                let _ = sender.send(Frame { from: id, text: text.into() });
            }
        });

        debug!(topic = %session_tag(&topic), link = id, "Link joined topic");
        Link::from_parts(out_tx, in_rx, reader)
    }

    /// Number of live topics.
    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }

    /// Drop topics nobody is subscribed to.
    pub async fn prune(&self) -> usize {
        let mut topics = self.topics.write().await;
        let before = topics.len();
        topics.retain(|_, sender| sender.receiver_count() > 0);
        before - topics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::PlayerId;
    use std::time::Duration;
    use tokio::time::timeout;

    fn heartbeat(session_id: SessionId, byte: u8) -> ChannelMessage {
        ChannelMessage::Heartbeat { session_id, player_id: PlayerId::new([byte; 16]) }
    }

    #[tokio::test]
    async fn test_messages_reach_other_links_only() {
        let hub = ChannelHub::new();
        let mut a = hub.join([1; 16]).await;
        let mut b = hub.join([1; 16]).await;

        a.publish(&heartbeat([1; 16], 1)).await.unwrap();

        let received = timeout(Duration::from_secs(1), b.recv()).await.unwrap();
        assert_eq!(received, Some(heartbeat([1; 16], 1)));

        // The sender does not hear its own frame
        assert!(timeout(Duration::from_millis(50), a.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let hub = ChannelHub::new();
        let a = hub.join([1; 16]).await;
        let mut other = hub.join([2; 16]).await;

        a.publish(&heartbeat([1; 16], 1)).await.unwrap();
        assert!(timeout(Duration::from_millis(50), other.recv()).await.is_err());
        assert_eq!(hub.topic_count().await, 2);
    }

    #[tokio::test]
    async fn test_prune_removes_abandoned_topics() {
        let hub = ChannelHub::new();
        let link = hub.join([7; 16]).await;
        assert_eq!(hub.prune().await, 0);

        drop(link);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(hub.prune().await, 1);
        assert_eq!(hub.topic_count().await, 0);
    }
}
