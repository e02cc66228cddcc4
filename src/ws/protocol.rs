//! Wire protocol for `/ws/events` (spec.md §6.2).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::event::Event;

/// Server → client frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Workflow-domain events, wrapped.
    Event { payload: Event },
    /// Flat shape for side-channel (e.g. brainstorm) events that reuse this
    /// fan-out infrastructure.
    Brainstorm {
        event_type: String,
        session_id: Uuid,
        message_id: Option<String>,
        data: serde_json::Value,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    Ping,
    BackfillComplete { count: usize },
    BackfillExpired { message: String },
}

/// Client → server frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { workflow_id: String },
    Unsubscribe { workflow_id: String },
    SubscribeAll,
    Pong,
}
