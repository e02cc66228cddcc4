//! The [`Workflow`] entity (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::WorkflowStatus;

/// `full` drives the whole architect → approval → developer → reviewer
/// graph; `review` is the autonomous, no-interrupt variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    Full,
    Review,
}

impl WorkflowType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Review => "review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(Self::Full),
            "review" => Some(Self::Review),
            _ => None,
        }
    }
}

/// One record per submitted unit of work (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub issue_id: String,
    pub worktree_path: String,
    pub workflow_type: WorkflowType,
    pub profile_id: String,
    pub status: WorkflowStatus,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub planned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub current_stage: Option<String>,
    pub failure_reason: Option<String>,
    pub consecutive_errors: u32,
    pub last_error_context: Option<String>,

    pub plan_cache: Option<serde_json::Value>,
    pub issue_cache: Option<serde_json::Value>,
    pub execution_state: Option<serde_json::Value>,
}

/// Characters allowed in an `issue_id`: safe alnum/dash/underscore, to
/// prevent injection into subprocess calls and path construction
/// (spec.md §3).
pub fn is_valid_issue_id(issue_id: &str) -> bool {
    !issue_id.is_empty()
        && issue_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl Workflow {
    pub fn new(issue_id: String, worktree_path: String, workflow_type: WorkflowType, profile_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            issue_id,
            worktree_path,
            workflow_type,
            profile_id,
            status: WorkflowStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            planned_at: None,
            completed_at: None,
            current_stage: None,
            failure_reason: None,
            consecutive_errors: 0,
            last_error_context: None,
            plan_cache: None,
            issue_cache: None,
            execution_state: None,
        }
    }
}
