//! On-disk representation of [`Workflow`](crate::domain::Workflow).
//! Timestamps are ISO8601 strings due to SQLite type affinity, matching
//! the teacher's `db/models/workflow.rs` convention.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::error::DbError;
use crate::domain::status::WorkflowStatus;
use crate::domain::workflow::{Workflow, WorkflowType};

#[derive(Debug, Clone, FromRow)]
pub struct WorkflowRow {
    pub id: String,
    pub issue_id: String,
    pub worktree_path: String,
    pub workflow_type: String,
    pub profile_id: String,
    pub status: String,
    pub created_at: String,
    pub started_at: Option<String>,
    pub planned_at: Option<String>,
    pub completed_at: Option<String>,
    pub current_stage: Option<String>,
    pub failure_reason: Option<String>,
    pub consecutive_errors: i64,
    pub last_error_context: Option<String>,
    pub plan_cache: Option<String>,
    pub issue_cache: Option<String>,
    pub execution_state: Option<String>,
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::type_error(format!("invalid timestamp {s:?}: {e}")))
}

fn parse_opt_ts(s: &Option<String>) -> Result<Option<DateTime<Utc>>, DbError> {
    s.as_deref().map(parse_ts).transpose()
}

fn parse_json(s: &Option<String>) -> Result<Option<serde_json::Value>, DbError> {
    s.as_deref()
        .map(|raw| serde_json::from_str(raw).map_err(|e| DbError::type_error(e.to_string())))
        .transpose()
}

impl WorkflowRow {
    pub fn into_domain(self) -> Result<Workflow, DbError> {
        Ok(Workflow {
            id: Uuid::parse_str(&self.id).map_err(|e| DbError::type_error(e.to_string()))?,
            issue_id: self.issue_id,
            worktree_path: self.worktree_path,
            workflow_type: WorkflowType::parse(&self.workflow_type)
                .ok_or_else(|| DbError::type_error(format!("unknown workflow_type {:?}", self.workflow_type)))?,
            profile_id: self.profile_id,
            status: WorkflowStatus::parse(&self.status)
                .ok_or_else(|| DbError::type_error(format!("unknown status {:?}", self.status)))?,
            created_at: parse_ts(&self.created_at)?,
            started_at: parse_opt_ts(&self.started_at)?,
            planned_at: parse_opt_ts(&self.planned_at)?,
            completed_at: parse_opt_ts(&self.completed_at)?,
            current_stage: self.current_stage,
            failure_reason: self.failure_reason,
            consecutive_errors: self.consecutive_errors as u32,
            last_error_context: self.last_error_context,
            plan_cache: parse_json(&self.plan_cache)?,
            issue_cache: parse_json(&self.issue_cache)?,
            execution_state: parse_json(&self.execution_state)?,
        })
    }

    pub fn from_domain(w: &Workflow) -> Self {
        Self {
            id: w.id.to_string(),
            issue_id: w.issue_id.clone(),
            worktree_path: w.worktree_path.clone(),
            workflow_type: w.workflow_type.as_str().to_string(),
            profile_id: w.profile_id.clone(),
            status: w.status.as_str().to_string(),
            created_at: w.created_at.to_rfc3339(),
            started_at: w.started_at.map(|t| t.to_rfc3339()),
            planned_at: w.planned_at.map(|t| t.to_rfc3339()),
            completed_at: w.completed_at.map(|t| t.to_rfc3339()),
            current_stage: w.current_stage.clone(),
            failure_reason: w.failure_reason.clone(),
            consecutive_errors: w.consecutive_errors as i64,
            last_error_context: w.last_error_context.clone(),
            plan_cache: w.plan_cache.as_ref().map(|v| v.to_string()),
            issue_cache: w.issue_cache.as_ref().map(|v| v.to_string()),
            execution_state: w.execution_state.as_ref().map(|v| v.to_string()),
        }
    }
}
