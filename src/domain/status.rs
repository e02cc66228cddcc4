//! Workflow lifecycle state machine (spec.md §3, authoritative transition table).

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

/// The six statuses a workflow can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    InProgress,
    Blocked,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    /// Terminal states are sinks: no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => Self::Pending,
            "in_progress" => Self::InProgress,
            "blocked" => Self::Blocked,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => return None,
        })
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates a transition against the authoritative table in spec.md §3.
///
/// | From \ To | pending | in_progress | blocked | completed | failed | cancelled |
/// |---|---|---|---|---|---|---|
/// | pending | — | ✓ | — | — | ✓ | ✓ |
/// | in_progress | — | — | ✓ | ✓ | ✓ | ✓ |
/// | blocked | — | ✓ | — | — | ✓ | ✓ |
/// | terminal | — | — | — | — | — | — |
pub fn validate_transition(
    from: WorkflowStatus,
    to: WorkflowStatus,
) -> Result<(), OrchestratorError> {
    use WorkflowStatus::*;

    let allowed = matches!(
        (from, to),
        (Pending, InProgress)
            | (Pending, Failed)
            | (Pending, Cancelled)
            | (InProgress, Blocked)
            | (InProgress, Completed)
            | (InProgress, Failed)
            | (InProgress, Cancelled)
            | (Blocked, InProgress)
            | (Blocked, Failed)
            | (Blocked, Cancelled)
    );

    if allowed {
        Ok(())
    } else {
        Err(OrchestratorError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
