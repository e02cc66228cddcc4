//! Workflow request/response DTOs, grounded on the teacher's
//! `api/models/workflow.rs`, reshaped around this service's domain
//! [`Workflow`] entity instead of the teacher's generic workflow-definition
//! blob.

use serde::{Deserialize, Serialize};

use crate::domain::event::Event;
use crate::domain::status::WorkflowStatus;
use crate::domain::token_usage::TokenSummary;
use crate::domain::workflow::{Workflow, WorkflowType};
use crate::orchestrator::gate::BlockerAction;

/// `POST /workflows` body (spec.md §6.1).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowRequest {
    pub issue_id: String,
    pub worktree_path: String,
    #[serde(default = "default_workflow_type")]
    pub workflow_type: String,
    #[serde(default = "default_profile_id")]
    pub profile_id: String,
}

fn default_workflow_type() -> String {
    "full".to_string()
}

fn default_profile_id() -> String {
    "default".to_string()
}

impl CreateWorkflowRequest {
    pub fn workflow_type(&self) -> crate::api::error::ApiResult<WorkflowType> {
        WorkflowType::parse(&self.workflow_type)
            .ok_or_else(|| crate::api::error::ApiError::Validation(format!("unknown workflow_type: {}", self.workflow_type)))
    }
}

/// `POST /workflows/{id}/reject` body.
#[derive(Debug, Clone, Deserialize)]
pub struct RejectRequest {
    pub feedback: String,
}

/// `POST /workflows/{id}/blocker/resolve` body.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockerResolveRequest {
    pub action: String,
    pub feedback: Option<String>,
}

impl BlockerResolveRequest {
    pub fn action(&self) -> crate::api::error::ApiResult<BlockerAction> {
        match self.action.as_str() {
            "skip" => Ok(BlockerAction::Skip),
            "retry" => Ok(BlockerAction::Retry),
            "abort" => Ok(BlockerAction::Abort),
            "abort_revert" => Ok(BlockerAction::AbortRevert),
            "fix" => Ok(BlockerAction::Fix),
            other => Err(crate::api::error::ApiError::Validation(format!("unknown blocker action: {other}"))),
        }
    }
}

/// `GET /workflows` query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowListQuery {
    pub status: Option<String>,
    pub cursor: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
}

fn default_list_limit() -> i64 {
    20
}

impl WorkflowListQuery {
    pub fn parsed_status(&self) -> crate::api::error::ApiResult<Option<WorkflowStatus>> {
        match &self.status {
            None => Ok(None),
            Some(s) => WorkflowStatus::parse(s)
                .map(Some)
                .ok_or_else(|| crate::api::error::ApiError::Validation(format!("unknown status: {s}"))),
        }
    }
}

/// `GET /workflows` / `GET /workflows/active` list-row shape.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummaryResponse {
    pub id: String,
    pub issue_id: String,
    pub worktree_path: String,
    pub workflow_type: &'static str,
    pub profile_id: String,
    pub status: WorkflowStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub current_stage: Option<String>,
}

impl From<Workflow> for WorkflowSummaryResponse {
    fn from(w: Workflow) -> Self {
        Self {
            id: w.id.to_string(),
            issue_id: w.issue_id,
            worktree_path: w.worktree_path,
            workflow_type: w.workflow_type.as_str(),
            profile_id: w.profile_id,
            status: w.status,
            created_at: w.created_at,
            started_at: w.started_at,
            completed_at: w.completed_at,
            current_stage: w.current_stage,
        }
    }
}

/// `GET /workflows/{id}` full-detail shape (spec.md §6.1): the workflow row
/// plus its plan cache, accumulated token usage, and recent event history.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDetailResponse {
    #[serde(flatten)]
    pub summary: WorkflowSummaryResponse,
    pub failure_reason: Option<String>,
    pub consecutive_errors: u32,
    pub plan_cache: Option<serde_json::Value>,
    pub token_summary: Option<TokenSummary>,
    pub recent_events: Vec<Event>,
}

impl WorkflowDetailResponse {
    pub fn new(workflow: Workflow, token_summary: Option<TokenSummary>, recent_events: Vec<Event>) -> Self {
        Self {
            failure_reason: workflow.failure_reason.clone(),
            consecutive_errors: workflow.consecutive_errors,
            plan_cache: workflow.plan_cache.clone(),
            summary: workflow.into(),
            token_summary,
            recent_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_parses_known_workflow_type() {
        let req = CreateWorkflowRequest {
            issue_id: "ISSUE-1".into(),
            worktree_path: "/tmp/w".into(),
            workflow_type: "full".into(),
            profile_id: "default".into(),
        };
        assert!(matches!(req.workflow_type(), Ok(WorkflowType::Full)));
    }

    #[test]
    fn create_request_rejects_unknown_workflow_type() {
        let req = CreateWorkflowRequest {
            issue_id: "ISSUE-1".into(),
            worktree_path: "/tmp/w".into(),
            workflow_type: "bogus".into(),
            profile_id: "default".into(),
        };
        assert!(req.workflow_type().is_err());
    }

    #[test]
    fn blocker_resolve_request_parses_known_action() {
        let req = BlockerResolveRequest { action: "skip".into(), feedback: None };
        assert!(matches!(req.action(), Ok(BlockerAction::Skip)));
    }

    #[test]
    fn blocker_resolve_request_rejects_unknown_action() {
        let req = BlockerResolveRequest { action: "teleport".into(), feedback: None };
        assert!(req.action().is_err());
    }
}
