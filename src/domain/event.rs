//! The [`Event`] entity and its classification (spec.md §3, §6.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Routing/persistence priority. `Trace` is stream-only and routed to
/// every connected client regardless of subscription (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

/// Enumerated event type (spec.md §6.3). Unknown tags are tolerated on
/// deserialization via `Other` (forward compatibility with new stages,
/// Design Note 1 in spec.md §9).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    WorkflowStarted,
    WorkflowCompleted,
    WorkflowFailed,
    WorkflowCancelled,
    StageStarted,
    StageCompleted,
    ApprovalRequired,
    ApprovalGranted,
    ApprovalRejected,
    FileCreated,
    FileModified,
    FileDeleted,
    ReviewRequested,
    ReviewCompleted,
    RevisionRequested,
    AgentMessage,
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    SystemError,
    SystemWarning,
    #[serde(other)]
    Other,
}

impl EventType {
    /// Fixed lookup table deriving `level` from `event_type`
    /// (spec.md §4.4.6 step 3).
    pub fn default_level(&self) -> EventLevel {
        use EventType::*;
        match self {
            WorkflowFailed | SystemError => EventLevel::Error,
            SystemWarning | RevisionRequested | TaskFailed => EventLevel::Warning,
            Other => EventLevel::Trace,
            _ => EventLevel::Info,
        }
    }

    /// True if this event type belongs to the persisted set (spec.md §6.3).
    /// All `trace`-level events (including the catch-all `Other`, used for
    /// per-token/trace payloads) are stream-only.
    pub fn is_persisted(&self) -> bool {
        !matches!(self, EventType::Other)
    }
}

/// One record per observable occurrence within a workflow (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub event_type: EventType,
    pub level: EventLevel,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub is_error: bool,
    pub correlation_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_event_type_tolerated_on_deserialize() {
        let parsed: EventType = serde_json::from_str("\"some_future_event\"").unwrap();
        assert_eq!(parsed, EventType::Other);
    }

    #[test]
    fn failure_types_derive_error_level() {
        assert_eq!(EventType::WorkflowFailed.default_level(), EventLevel::Error);
        assert_eq!(EventType::SystemError.default_level(), EventLevel::Error);
    }

    #[test]
    fn only_trace_catch_all_is_non_persisted() {
        assert!(EventType::WorkflowStarted.is_persisted());
        assert!(EventType::StageCompleted.is_persisted());
        assert!(!EventType::Other.is_persisted());
    }
}
