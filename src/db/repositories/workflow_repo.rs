//! Workflow persistence operations (spec.md §4.1), grounded on the
//! teacher's `db/repositories/workflow_repo.rs`.

use chrono::Utc;

use crate::db::connection::DatabasePool;
use crate::db::cursor::Cursor;
use crate::db::error::DbError;
use crate::db::models::WorkflowRow;
use crate::domain::status::WorkflowStatus;
use crate::domain::workflow::Workflow;

pub struct WorkflowRepository;

/// A page of workflows plus the cursor to request the next one.
pub struct WorkflowPage {
    pub items: Vec<Workflow>,
    pub next_cursor: Option<String>,
}

impl WorkflowRepository {
    pub async fn create(pool: &DatabasePool, workflow: &Workflow) -> Result<Workflow, DbError> {
        let row = WorkflowRow::from_domain(workflow);
        sqlx::query(
            "INSERT INTO workflows (
                id, issue_id, worktree_path, workflow_type, profile_id, status,
                created_at, started_at, planned_at, completed_at, current_stage,
                failure_reason, consecutive_errors, last_error_context,
                plan_cache, issue_cache, execution_state
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.issue_id)
        .bind(&row.worktree_path)
        .bind(&row.workflow_type)
        .bind(&row.profile_id)
        .bind(&row.status)
        .bind(&row.created_at)
        .bind(&row.started_at)
        .bind(&row.planned_at)
        .bind(&row.completed_at)
        .bind(&row.current_stage)
        .bind(&row.failure_reason)
        .bind(row.consecutive_errors)
        .bind(&row.last_error_context)
        .bind(&row.plan_cache)
        .bind(&row.issue_cache)
        .bind(&row.execution_state)
        .execute(pool)
        .await?;

        Ok(workflow.clone())
    }

    pub async fn get_by_id(pool: &DatabasePool, id: &str) -> Result<Option<Workflow>, DbError> {
        let row = sqlx::query_as::<_, WorkflowRow>("SELECT * FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        row.map(WorkflowRow::into_domain).transpose()
    }

    /// The worktree's current active workflow, if any, enforcing the
    /// `idx_workflows_worktree_active` partial-unique invariant at read time.
    pub async fn get_active_by_worktree(
        pool: &DatabasePool,
        worktree_path: &str,
    ) -> Result<Option<Workflow>, DbError> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            "SELECT * FROM workflows
             WHERE worktree_path = ? AND status IN ('in_progress', 'blocked')",
        )
        .bind(worktree_path)
        .fetch_optional(pool)
        .await?;
        row.map(WorkflowRow::into_domain).transpose()
    }

    pub async fn set_status(
        pool: &DatabasePool,
        id: &str,
        status: WorkflowStatus,
        failure_reason: Option<&str>,
    ) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339();
        let completed_at = status.is_terminal().then(|| now.clone());
        let started_at = matches!(status, WorkflowStatus::InProgress).then(|| now.clone());

        sqlx::query(
            "UPDATE workflows SET
                status = ?,
                failure_reason = COALESCE(?, failure_reason),
                completed_at = COALESCE(?, completed_at),
                started_at = COALESCE(started_at, ?)
             WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(failure_reason)
        .bind(completed_at)
        .bind(started_at)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn update_current_stage(pool: &DatabasePool, id: &str, stage: &str) -> Result<(), DbError> {
        sqlx::query("UPDATE workflows SET current_stage = ? WHERE id = ?")
            .bind(stage)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_plan_cache(
        pool: &DatabasePool,
        id: &str,
        plan_cache: &serde_json::Value,
    ) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE workflows SET plan_cache = ?, planned_at = ? WHERE id = ?")
            .bind(plan_cache.to_string())
            .bind(now)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_execution_state(
        pool: &DatabasePool,
        id: &str,
        execution_state: &serde_json::Value,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE workflows SET execution_state = ? WHERE id = ?")
            .bind(execution_state.to_string())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn record_error(
        pool: &DatabasePool,
        id: &str,
        consecutive_errors: u32,
        last_error_context: &str,
    ) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE workflows SET consecutive_errors = ?, last_error_context = ? WHERE id = ?",
        )
        .bind(consecutive_errors as i64)
        .bind(last_error_context)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn reset_consecutive_errors(pool: &DatabasePool, id: &str) -> Result<(), DbError> {
        sqlx::query("UPDATE workflows SET consecutive_errors = 0, last_error_context = NULL WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Transitions a `failed` workflow back to `in_progress` for
    /// `resume_workflow` (spec.md §4.4.5), clearing the fields a plain
    /// `set_status` call intentionally preserves.
    pub async fn clear_for_resume(pool: &DatabasePool, id: &str) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE workflows SET status = 'in_progress', failure_reason = NULL, completed_at = NULL
             WHERE id = ?",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Cursor-paginated listing ordered by `started_at DESC, id DESC`
    /// (spec.md §6.1/§4.1): `WHERE (started_at < :t) OR (started_at = :t AND id < :i)`,
    /// fetching `limit + 1` rows to detect `has_more`.
    pub async fn list_workflows(
        pool: &DatabasePool,
        status: Option<WorkflowStatus>,
        cursor: Option<&str>,
        limit: i64,
    ) -> Result<WorkflowPage, DbError> {
        let decoded = cursor.map(Cursor::decode).transpose()?;
        let status_str = status.map(|s| s.as_str());

        let rows = match (&decoded, &status_str) {
            (Some(c), Some(s)) => {
                sqlx::query_as::<_, WorkflowRow>(
                    "SELECT * FROM workflows
                     WHERE status = ?
                       AND (started_at < ? OR (started_at = ? AND id < ?))
                     ORDER BY started_at DESC, id DESC
                     LIMIT ?",
                )
                .bind(s)
                .bind(c.started_at.to_rfc3339())
                .bind(c.started_at.to_rfc3339())
                .bind(&c.id)
                .bind(limit + 1)
                .fetch_all(pool)
                .await?
            }
            (Some(c), None) => {
                sqlx::query_as::<_, WorkflowRow>(
                    "SELECT * FROM workflows
                     WHERE (started_at < ? OR (started_at = ? AND id < ?))
                     ORDER BY started_at DESC, id DESC
                     LIMIT ?",
                )
                .bind(c.started_at.to_rfc3339())
                .bind(c.started_at.to_rfc3339())
                .bind(&c.id)
                .bind(limit + 1)
                .fetch_all(pool)
                .await?
            }
            (None, Some(s)) => {
                sqlx::query_as::<_, WorkflowRow>(
                    "SELECT * FROM workflows WHERE status = ?
                     ORDER BY started_at DESC, id DESC LIMIT ?",
                )
                .bind(s)
                .bind(limit + 1)
                .fetch_all(pool)
                .await?
            }
            (None, None) => {
                sqlx::query_as::<_, WorkflowRow>(
                    "SELECT * FROM workflows ORDER BY started_at DESC, id DESC LIMIT ?",
                )
                .bind(limit + 1)
                .fetch_all(pool)
                .await?
            }
        };

        let has_more = rows.len() as i64 > limit;
        let mut items = rows
            .into_iter()
            .take(limit as usize)
            .map(WorkflowRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        let next_cursor = if has_more {
            items.last().and_then(|w| w.started_at.map(|t| Cursor::encode(t, &w.id.to_string())))
        } else {
            None
        };

        items.truncate(limit as usize);
        Ok(WorkflowPage { items, next_cursor })
    }

    pub async fn list_active(pool: &DatabasePool) -> Result<Vec<Workflow>, DbError> {
        let rows = sqlx::query_as::<_, WorkflowRow>(
            "SELECT * FROM workflows WHERE status IN ('in_progress', 'blocked')
             ORDER BY started_at DESC",
        )
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(WorkflowRow::into_domain).collect()
    }

    pub async fn count_workflows(pool: &DatabasePool, status: Option<WorkflowStatus>) -> Result<i64, DbError> {
        let count: (i64,) = match status {
            Some(s) => {
                sqlx::query_as("SELECT COUNT(*) FROM workflows WHERE status = ?")
                    .bind(s.as_str())
                    .fetch_one(pool)
                    .await?
            }
            None => sqlx::query_as("SELECT COUNT(*) FROM workflows").fetch_one(pool).await?,
        };
        Ok(count.0)
    }

    pub async fn count_active(pool: &DatabasePool) -> Result<i64, DbError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM workflows WHERE status IN ('in_progress', 'blocked')")
                .fetch_one(pool)
                .await?;
        Ok(count.0)
    }

    pub async fn find_by_status(pool: &DatabasePool, status: WorkflowStatus) -> Result<Vec<Workflow>, DbError> {
        let rows = sqlx::query_as::<_, WorkflowRow>(
            "SELECT * FROM workflows WHERE status = ? ORDER BY created_at DESC",
        )
        .bind(status.as_str())
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(WorkflowRow::into_domain).collect()
    }
}
