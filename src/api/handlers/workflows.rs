//! Workflow endpoint handlers (spec.md §6.1), grounded on the teacher's
//! `api/handlers/workflows.rs` CRUD-handler shape, generalized to the
//! admission/approval/blocker-resolution action endpoints this spec
//! requires and the teacher's CRUD handlers do not have.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::api::middleware::validation::validate_limit;
use crate::api::models::{
    BlockerResolveRequest, CreateWorkflowRequest, RejectRequest, WorkflowDetailResponse, WorkflowListQuery,
    WorkflowSummaryResponse,
};
use crate::api::response;
use crate::api::routes::AppState;
use crate::db::repositories::{EventRepository, TokenUsageRepository, WorkflowRepository};
use crate::error::OrchestratorError;

const DEFAULT_RECENT_EVENTS: i64 = 50;
const MAX_LIST_LIMIT: i64 = 100;

/// POST /workflows
pub async fn create_workflow(
    State(state): State<AppState>,
    Json(req): Json<CreateWorkflowRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let workflow_type = req.workflow_type()?;
    let workflow = state
        .orchestrator
        .start_workflow(req.issue_id, req.worktree_path, workflow_type, req.profile_id)
        .await?;

    tracing::info!(workflow_id = %workflow.id, "workflow created");
    Ok(response::created(json!({
        "id": workflow.id,
        "status": workflow.status,
        "message": "workflow started",
    })))
}

/// GET /workflows
pub async fn list_workflows(
    State(state): State<AppState>,
    Query(query): Query<WorkflowListQuery>,
) -> ApiResult<impl axum::response::IntoResponse> {
    validate_limit(query.limit, MAX_LIST_LIMIT)?;
    let status = query.parsed_status()?;

    let page = WorkflowRepository::list_workflows(state.db.pool(), status, query.cursor.as_deref(), query.limit)
        .await
        .map_err(OrchestratorError::from)?;

    let items: Vec<WorkflowSummaryResponse> = page.items.into_iter().map(Into::into).collect();
    Ok(response::paginated(items, page.next_cursor))
}

/// GET /workflows/active
pub async fn list_active(State(state): State<AppState>) -> ApiResult<impl axum::response::IntoResponse> {
    let workflows = WorkflowRepository::list_active(state.db.pool()).await.map_err(OrchestratorError::from)?;
    let items: Vec<WorkflowSummaryResponse> = workflows.into_iter().map(Into::into).collect();
    Ok(response::ok(items))
}

/// GET /workflows/{id}
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let workflow = WorkflowRepository::get_by_id(state.db.pool(), &id)
        .await
        .map_err(OrchestratorError::from)?
        .ok_or_else(|| OrchestratorError::NotFound(id.clone()))?;

    let token_summary =
        TokenUsageRepository::get_token_summary(state.db.pool(), &id).await.map_err(OrchestratorError::from)?;
    let recent_events = EventRepository::get_recent_events(state.db.pool(), &id, DEFAULT_RECENT_EVENTS)
        .await
        .map_err(OrchestratorError::from)?;

    Ok(response::ok(WorkflowDetailResponse::new(workflow, token_summary, recent_events)))
}

/// POST /workflows/{id}/approve
pub async fn approve_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let workflow_id = parse_workflow_id(&id)?;
    state.orchestrator.approve_workflow(workflow_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /workflows/{id}/reject
pub async fn reject_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RejectRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let workflow_id = parse_workflow_id(&id)?;
    state.orchestrator.reject_workflow(workflow_id, req.feedback).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /workflows/{id}/cancel
pub async fn cancel_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let workflow_id = parse_workflow_id(&id)?;
    state.orchestrator.cancel_workflow(workflow_id, "cancelled via API").await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /workflows/{id}/resume
pub async fn resume_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let workflow_id = parse_workflow_id(&id)?;
    state.orchestrator.resume_workflow(workflow_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /workflows/{id}/blocker/resolve
pub async fn resolve_blocker(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<BlockerResolveRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let workflow_id = parse_workflow_id(&id)?;
    let action = req.action()?;
    state.orchestrator.resolve_blocker(workflow_id, action, req.feedback).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_workflow_id(id: &str) -> ApiResult<uuid::Uuid> {
    uuid::Uuid::parse_str(id).map_err(|_| ApiError::Validation(format!("invalid workflow id: {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_workflow_id_rejects_malformed_input() {
        assert!(parse_workflow_id("not-a-uuid").is_err());
    }

    #[test]
    fn parse_workflow_id_accepts_well_formed_uuid() {
        assert!(parse_workflow_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
    }
}
