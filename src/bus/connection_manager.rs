//! Per-connection subscription-filtered fan-out, grounded on
//! `original_source/amelia/server/events/connection_manager.py`. Rust has no
//! `WebSocket` object to key a map by, so connections are identified by a
//! generated [`ConnectionId`] and reached through an
//! `UnboundedSender<ServerMessage>` instead of awaiting a socket write
//! directly — the send timeout and disconnect reaping the source does
//! per-client become a bounded `send` against that channel plus reaping on
//! a closed receiver.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;

use crate::domain::event::{Event, EventLevel};
use crate::ws::protocol::ServerMessage;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

struct Connection {
    sender: UnboundedSender<ServerMessage>,
    /// Empty set = subscribed to all workflows.
    subscribed: HashSet<String>,
}

#[derive(Default)]
pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self) -> (ConnectionId, UnboundedReceiver<ServerMessage>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.write().await.insert(id, Connection { sender: tx, subscribed: HashSet::new() });
        (id, rx)
    }

    pub async fn disconnect(&self, id: ConnectionId) {
        self.connections.write().await.remove(&id);
    }

    pub async fn subscribe(&self, id: ConnectionId, workflow_id: &str) {
        if let Some(conn) = self.connections.write().await.get_mut(&id) {
            conn.subscribed.insert(workflow_id.to_string());
        }
    }

    pub async fn unsubscribe(&self, id: ConnectionId, workflow_id: &str) {
        if let Some(conn) = self.connections.write().await.get_mut(&id) {
            conn.subscribed.remove(workflow_id);
        }
    }

    pub async fn subscribe_all(&self, id: ConnectionId) {
        if let Some(conn) = self.connections.write().await.get_mut(&id) {
            conn.subscribed.clear();
        }
    }

    /// Trace-level events go to every client; everything else is filtered
    /// by workflow subscription (empty subscription set = all workflows).
    pub async fn broadcast(&self, event: &Event) {
        let is_trace = event.level == EventLevel::Trace;
        let message = ServerMessage::Event { payload: event.clone() };

        let targets: Vec<ConnectionId> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .filter(|(_, conn)| {
                    is_trace
                        || conn.subscribed.is_empty()
                        || conn.subscribed.contains(&event.workflow_id.to_string())
                })
                .map(|(id, _)| *id)
                .collect()
        };

        self.send_to(&targets, message).await;
    }

    /// Stream events (trace-level) are broadcast to all clients without
    /// persistence or subscriber notification — see `EventBus::emit_stream`.
    pub async fn broadcast_stream(&self, message: ServerMessage) {
        let targets: Vec<ConnectionId> = self.connections.read().await.keys().copied().collect();
        self.send_to(&targets, message).await;
    }

    async fn send_to(&self, targets: &[ConnectionId], message: ServerMessage) {
        if targets.is_empty() {
            return;
        }

        let senders: Vec<(ConnectionId, UnboundedSender<ServerMessage>)> = {
            let connections = self.connections.read().await;
            targets
                .iter()
                .filter_map(|id| connections.get(id).map(|c| (*id, c.sender.clone())))
                .collect()
        };

        let mut failed = Vec::new();
        for (id, sender) in senders {
            let sent = tokio::time::timeout(SEND_TIMEOUT, async { sender.send(message.clone()) })
                .await
                .map(|r| r.is_ok())
                .unwrap_or(false);
            if !sent {
                failed.push(id);
            }
        }

        if !failed.is_empty() {
            let mut connections = self.connections.write().await;
            for id in failed {
                connections.remove(&id);
            }
        }
    }

    pub async fn close_all(&self) {
        self.connections.write().await.clear();
    }

    pub async fn active_connections(&self) -> usize {
        self.connections.read().await.len()
    }
}
