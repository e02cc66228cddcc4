//! Synchronous pub/sub over workflow events plus WebSocket fan-out,
//! grounded on `original_source/amelia/server/events/bus.py`.
//!
//! The source logs-and-continues when a subscriber raises; Rust has no
//! catchable base exception type subscribers might throw, so the callback
//! signature returns `anyhow::Result<()>` and errors are logged the same
//! way instead of being allowed to unwind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;

use super::connection_manager::ConnectionManager;
use super::fanout::EventDomain;
use crate::domain::event::Event;
use crate::ws::protocol::ServerMessage;

pub type Subscriber = Box<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    callback: Subscriber,
}

/// Pub/sub bus. All subscribers run synchronously inside `emit` — they
/// must be non-blocking, matching the source's own warning.
pub struct EventBus {
    subscribers: Mutex<Vec<Entry>>,
    connection_manager: Option<Arc<ConnectionManager>>,
    next_subscription_id: AtomicU64,
    broadcast_tasks: Mutex<JoinSet<()>>,
}

impl EventBus {
    pub fn new(connection_manager: Option<Arc<ConnectionManager>>) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            connection_manager,
            next_subscription_id: AtomicU64::new(0),
            broadcast_tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn subscribe(&self, callback: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push(Entry { id, callback });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().retain(|entry| entry.id != id);
    }

    /// Notifies subscribers in registration order, then spawns a broadcast
    /// to WebSocket clients. A subscriber's error is logged and does not
    /// stop the remaining subscribers or the broadcast.
    pub fn emit(&self, event: Event) {
        {
            let subscribers = self.subscribers.lock();
            for entry in subscribers.iter() {
                if let Err(err) = (entry.callback)(&event) {
                    tracing::error!(
                        workflow_id = %event.workflow_id,
                        event_type = ?event.event_type,
                        error = %err,
                        "subscriber raised an error"
                    );
                }
            }
        }

        if let Some(manager) = self.connection_manager.clone() {
            self.broadcast_tasks.lock().spawn(async move {
                manager.broadcast(&event).await;
            });
        }
    }

    /// Broadcasts a stream (trace-level) event without persisting it and
    /// without notifying the regular subscriber list (spec.md §6.3).
    pub fn emit_stream(&self, event: &Event) {
        let Some(manager) = self.connection_manager.clone() else { return };
        let message = EventDomain::Workflow.frame(event);
        self.broadcast_tasks.lock().spawn(async move {
            manager.broadcast_stream(message).await;
        });
    }

    pub fn emit_brainstorm(&self, message: ServerMessage) {
        let Some(manager) = self.connection_manager.clone() else { return };
        self.broadcast_tasks.lock().spawn(async move {
            manager.broadcast_stream(message).await;
        });
    }

    /// Waits for all pending broadcast tasks to finish. Call during
    /// graceful shutdown to ensure delivery before the server stops.
    pub async fn cleanup(&self) {
        let mut tasks = std::mem::replace(&mut *self.broadcast_tasks.lock(), JoinSet::new());
        while tasks.join_next().await.is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{EventLevel, EventType};
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use uuid::Uuid;

    fn sample_event() -> Event {
        Event {
            id: Uuid::new_v4(),
            workflow_id: Uuid::new_v4(),
            sequence: 1,
            timestamp: Utc::now(),
            agent: "architect".into(),
            event_type: EventType::WorkflowStarted,
            level: EventLevel::Info,
            message: "hi".into(),
            data: None,
            is_error: false,
            correlation_id: None,
        }
    }

    #[test]
    fn all_subscribers_run_even_if_one_errors() {
        let bus = EventBus::new(None);
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_a = calls.clone();
        bus.subscribe(Box::new(move |_event| {
            calls_a.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("boom"))
        }));

        let calls_b = calls.clone();
        bus.subscribe(Box::new(move |_event| {
            calls_b.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        bus.emit(sample_event());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_stops_future_notifications() {
        let bus = EventBus::new(None);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let id = bus.subscribe(Box::new(move |_event| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        bus.unsubscribe(id);
        bus.emit(sample_event());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
