//! `/ws/events` WebSocket endpoint. Completes the teacher's
//! `api/ws/handler.rs` stub, which returned a JSON placeholder instead of
//! actually upgrading, using axum's built-in `extract::ws` support.
//! Protocol and backfill semantics grounded on
//! `original_source/amelia/server/routes/websocket.py`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use super::protocol::{ClientMessage, ServerMessage};
use crate::bus::ConnectionManager;
use crate::db::connection::DatabasePool;
use crate::db::repositories::EventRepository;

const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// State handed to the WebSocket route, split out from the REST
/// [`AppState`](crate::api::routes::AppState) so this module doesn't need
/// to depend on `api`.
#[derive(Clone)]
pub struct WsState {
    pub connections: Arc<ConnectionManager>,
    pub pool: DatabasePool,
    pub ping_interval: Duration,
}

impl WsState {
    pub fn new(connections: Arc<ConnectionManager>, pool: DatabasePool) -> Self {
        Self { connections, pool, ping_interval: DEFAULT_PING_INTERVAL }
    }

    pub fn with_ping_interval(mut self, ping_interval: Duration) -> Self {
        self.ping_interval = ping_interval;
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Event id to replay missed events after, for reconnect backfill.
    pub since: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<WsState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        handle_socket(socket, state.connections, state.pool, state.ping_interval, query.since)
    })
}

async fn handle_socket(
    socket: WebSocket,
    connections: Arc<ConnectionManager>,
    pool: DatabasePool,
    ping_interval: Duration,
    since: Option<String>,
) {
    let (mut sender, mut receiver) = socket.split();
    let (id, mut outbox) = connections.connect().await;

    let active = connections.active_connections().await;
    tracing::info!(active_connections = active, "websocket connected");

    if let Some(since_event_id) = since {
        match backfill(&pool, &since_event_id).await {
            Ok(messages) => {
                for message in messages {
                    if send_json(&mut sender, &message).await.is_err() {
                        break;
                    }
                }
            }
            Err(message) => {
                let _ = send_json(&mut sender, &message).await;
            }
        }
    }

    let mut ping_tick = tokio::time::interval(ping_interval);
    ping_tick.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            _ = ping_tick.tick() => {
                if send_json(&mut sender, &ServerMessage::Ping).await.is_err() {
                    break;
                }
            }
            outgoing = outbox.recv() => {
                match outgoing {
                    Some(message) => {
                        if send_json(&mut sender, &message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&connections, id, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "websocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    connections.disconnect(id).await;
    let active = connections.active_connections().await;
    tracing::info!(active_connections = active, "websocket cleanup");
}

async fn handle_client_message(connections: &ConnectionManager, id: crate::bus::ConnectionId, text: &str) {
    let Ok(message) = serde_json::from_str::<ClientMessage>(text) else {
        tracing::debug!(raw = text, "ignoring unrecognized client message");
        return;
    };

    match message {
        ClientMessage::Subscribe { workflow_id } => connections.subscribe(id, &workflow_id).await,
        ClientMessage::Unsubscribe { workflow_id } => connections.unsubscribe(id, &workflow_id).await,
        ClientMessage::SubscribeAll => connections.subscribe_all(id).await,
        ClientMessage::Pong => tracing::debug!("heartbeat pong received"),
    }
}

/// Replays events after `since_event_id`'s sequence in the same workflow,
/// or a `backfill_expired` message if that event is no longer known.
async fn backfill(pool: &DatabasePool, since_event_id: &str) -> Result<Vec<ServerMessage>, ServerMessage> {
    if !EventRepository::event_exists(pool, since_event_id).await.unwrap_or(false) {
        return Err(ServerMessage::BackfillExpired {
            message: "requested event no longer exists; full refresh required".into(),
        });
    }

    // event_exists already validated the id; look up its sequence and
    // workflow via the log to replay everything after it.
    let row: Option<(String, i64)> =
        sqlx::query_as("SELECT workflow_id, sequence FROM workflow_log WHERE id = ?")
            .bind(since_event_id)
            .fetch_optional(pool)
            .await
            .ok()
            .flatten();

    let Some((workflow_id, sequence)) = row else {
        return Err(ServerMessage::BackfillExpired {
            message: "requested event no longer exists; full refresh required".into(),
        });
    };

    let events = EventRepository::get_events_after(pool, &workflow_id, sequence as u64)
        .await
        .unwrap_or_default();

    let count = events.len();
    let mut messages: Vec<ServerMessage> =
        events.into_iter().map(|event| ServerMessage::Event { payload: event }).collect();
    messages.push(ServerMessage::BackfillComplete { count });
    Ok(messages)
}

async fn send_json(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).unwrap_or_default();
    sender.send(Message::Text(text)).await
}
