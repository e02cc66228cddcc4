//! The Orchestrator (spec.md §4.4): admission, the per-workflow graph
//! supervisor, human-gate resolution, retry policy, cancellation, and
//! crash recovery. Grounded on the teacher's service-layer pattern
//! (`services/workflow.rs`) and `original_source/amelia/server/orchestrator/service.py`.

pub mod gate;
pub mod retry;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::Mutex as SyncMutex;
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::bus::EventBus;
use crate::db::connection::DatabasePool;
use crate::db::error::DbError;
use crate::db::repositories::{EventRepository, WorkflowRepository};
use crate::domain::event::{Event, EventType};
use crate::domain::graph_chunk::GraphChunk;
use crate::domain::status::WorkflowStatus;
use crate::domain::workflow::{is_valid_issue_id, Workflow, WorkflowType};
use crate::error::{OrchestratorError, Result};
use crate::graph::{GraphError, GraphExecutor, GraphExecutorFactory, GraphRunConfig};

pub use gate::BlockerAction;
pub use retry::RetryConfig;

struct ActiveTask {
    workflow_id: Uuid,
    handle: JoinHandle<()>,
}

/// What a single graph run attempt ended with.
enum Outcome {
    Completed,
    Interrupted(GraphChunk),
}

pub struct Orchestrator {
    pool: DatabasePool,
    event_bus: Arc<EventBus>,
    graph_factory: Arc<dyn GraphExecutorFactory>,
    active: SyncMutex<HashMap<String, ActiveTask>>,
    start_lock: AsyncMutex<()>,
    approval_lock: AsyncMutex<()>,
    sequence_locks: DashMap<Uuid, Arc<AsyncMutex<u64>>>,
    max_concurrent: usize,
    retry_config: RetryConfig,
}

impl Orchestrator {
    pub fn new(
        pool: DatabasePool,
        event_bus: Arc<EventBus>,
        graph_factory: Arc<dyn GraphExecutorFactory>,
        max_concurrent: usize,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            pool,
            event_bus,
            graph_factory,
            active: SyncMutex::new(HashMap::new()),
            start_lock: AsyncMutex::new(()),
            approval_lock: AsyncMutex::new(()),
            sequence_locks: DashMap::new(),
            max_concurrent,
            retry_config,
        }
    }

    // ---- 4.4.1 Admission ------------------------------------------------

    pub async fn start_workflow(
        self: &Arc<Self>,
        issue_id: String,
        worktree_path: String,
        workflow_type: WorkflowType,
        profile_id: String,
    ) -> Result<Workflow> {
        if !is_valid_issue_id(&issue_id) {
            return Err(OrchestratorError::ValidationError(format!(
                "invalid issue id: {issue_id}"
            )));
        }
        validate_worktree(&worktree_path).await?;

        let _guard = self.start_lock.lock().await;

        {
            let active = self.active.lock();
            if active.contains_key(&worktree_path) {
                return Err(OrchestratorError::WorktreeConflict(worktree_path));
            }
            if active.len() >= self.max_concurrent {
                return Err(OrchestratorError::ConcurrencyLimit {
                    current: active.len(),
                    max: self.max_concurrent,
                });
            }
        }

        let workflow = Workflow::new(issue_id, worktree_path.clone(), workflow_type, profile_id);
        let created = match WorkflowRepository::create(&self.pool, &workflow).await {
            Ok(w) => w,
            Err(DbError::ConstraintViolation(msg)) => {
                return Err(OrchestratorError::WorktreeConflict(msg))
            }
            Err(err) => return Err(err.into()),
        };

        let handle = self.spawn_supervisor(created.id, worktree_path.clone(), true);
        self.active
            .lock()
            .insert(worktree_path, ActiveTask { workflow_id: created.id, handle });

        Ok(created)
    }

    fn spawn_supervisor(self: &Arc<Self>, workflow_id: Uuid, worktree_path: String, fresh: bool) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = this.drive_graph(workflow_id, fresh).await {
                tracing::error!(workflow_id = %workflow_id, error = %err, "workflow supervisor failed");
            }
            this.finish_task(&worktree_path);
        })
    }

    fn finish_task(&self, worktree_path: &str) {
        let mut active = self.active.lock();
        if let Some(task) = active.remove(worktree_path) {
            self.sequence_locks.remove(&task.workflow_id);
        }
    }

    // ---- 4.4.2 Per-workflow supervisor -----------------------------------

    /// `fresh = true` is a brand new run (pending → in_progress,
    /// `WORKFLOW_STARTED`); `fresh = false` is a resume from an approval,
    /// blocker resolution, or operator-triggered `resume_workflow` where
    /// the caller has already performed its own transition/emission.
    async fn drive_graph(&self, workflow_id: Uuid, fresh: bool) -> Result<()> {
        let id_str = workflow_id.to_string();
        let executor = self.graph_factory.build_graph(&gate::interrupt_before_nodes()).await?;
        let config = GraphRunConfig { thread_id: id_str.clone() };

        if fresh {
            WorkflowRepository::set_status(&self.pool, &id_str, WorkflowStatus::InProgress, None).await?;
            self.emit(workflow_id, EventType::WorkflowStarted, "workflow started".into(), "system", None, None)
                .await?;
        }

        let mut attempt: u32 = 0;
        loop {
            let workflow = WorkflowRepository::get_by_id(&self.pool, &id_str)
                .await?
                .ok_or_else(|| OrchestratorError::NotFound(id_str.clone()))?;
            let initial_state = workflow.execution_state.clone();

            match self.run_once(workflow_id, executor.as_ref(), &config, initial_state).await {
                Ok(Outcome::Completed) => {
                    self.emit(
                        workflow_id,
                        EventType::WorkflowCompleted,
                        "workflow completed".into(),
                        "system",
                        None,
                        None,
                    )
                    .await?;
                    WorkflowRepository::set_status(&self.pool, &id_str, WorkflowStatus::Completed, None).await?;
                    WorkflowRepository::reset_consecutive_errors(&self.pool, &id_str).await?;
                    return Ok(());
                }
                Ok(Outcome::Interrupted(chunk)) => {
                    self.handle_interrupt(workflow_id, executor.as_ref(), &config, chunk).await?;
                    WorkflowRepository::reset_consecutive_errors(&self.pool, &id_str).await?;
                    return Ok(());
                }
                Err(GraphError::Permanent(message)) => {
                    self.emit(
                        workflow_id,
                        EventType::WorkflowFailed,
                        message.clone(),
                        "system",
                        Some(json!({ "attempts": attempt + 1 })),
                        None,
                    )
                    .await?;
                    WorkflowRepository::set_status(&self.pool, &id_str, WorkflowStatus::Failed, Some(&message))
                        .await?;
                    return Ok(());
                }
                Err(GraphError::Transient { cause, message }) => {
                    attempt += 1;
                    WorkflowRepository::record_error(&self.pool, &id_str, attempt, &message).await?;

                    if attempt > self.retry_config.max_retries {
                        self.emit(
                            workflow_id,
                            EventType::WorkflowFailed,
                            message.clone(),
                            "system",
                            Some(json!({ "attempts": attempt, "cause": format!("{cause:?}") })),
                            None,
                        )
                        .await?;
                        WorkflowRepository::set_status(&self.pool, &id_str, WorkflowStatus::Failed, Some(&message))
                            .await?;
                        return Ok(());
                    }

                    let delay = self.retry_config.backoff_delay(attempt);
                    tracing::warn!(
                        workflow_id = %workflow_id,
                        attempt,
                        delay_ms = delay.as_millis(),
                        cause = ?cause,
                        "transient graph error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn run_once(
        &self,
        workflow_id: Uuid,
        executor: &dyn GraphExecutor,
        config: &GraphRunConfig,
        initial_state: Option<serde_json::Value>,
    ) -> std::result::Result<Outcome, GraphError> {
        let mut stream = executor
            .stream(initial_state, config)
            .await
            .map_err(|err| GraphError::Permanent(err.to_string()))?;

        while let Some(item) = stream.next().await {
            let chunk = item?;
            if chunk.is_interrupt() {
                return Ok(Outcome::Interrupted(chunk));
            }
            self.handle_node_update(workflow_id, &chunk)
                .await
                .map_err(|err| GraphError::Permanent(err.to_string()))?;
        }
        Ok(Outcome::Completed)
    }

    /// Translates one node-update chunk into `STAGE_STARTED`/`STAGE_COMPLETED`
    /// plus any agent-specific message the node carries (spec.md §4.4.2).
    async fn handle_node_update(&self, workflow_id: Uuid, chunk: &GraphChunk) -> Result<()> {
        let node = chunk.node_name().unwrap_or("unknown").to_string();
        let id_str = workflow_id.to_string();

        self.emit(workflow_id, EventType::StageStarted, format!("{node} started"), &node, None, None)
            .await?;

        match chunk {
            GraphChunk::Architect { plan_summary, plan_markdown, key_files, task_count } => {
                let data = json!({
                    "plan_markdown": plan_markdown,
                    "key_files": key_files,
                    "task_count": task_count,
                });
                self.emit(workflow_id, EventType::AgentMessage, plan_summary.clone(), "architect", Some(data), None)
                    .await?;
            }
            GraphChunk::Developer { step_results } => {
                for step in step_results {
                    let event_type = if step.succeeded { EventType::TaskCompleted } else { EventType::TaskFailed };
                    self.emit(
                        workflow_id,
                        event_type,
                        step.summary.clone(),
                        "developer",
                        Some(json!({ "step_id": step.step_id })),
                        None,
                    )
                    .await?;
                }
            }
            GraphChunk::Reviewer { review_summary, approved } => {
                let event_type = if *approved { EventType::ReviewCompleted } else { EventType::RevisionRequested };
                self.emit(
                    workflow_id,
                    event_type,
                    review_summary.clone(),
                    "reviewer",
                    Some(json!({ "approved": approved })),
                    None,
                )
                .await?;
            }
            GraphChunk::BlockerNode { blocker_payload } => {
                self.emit(
                    workflow_id,
                    EventType::AgentMessage,
                    "blocker raised".into(),
                    &node,
                    Some(blocker_payload.clone()),
                    None,
                )
                .await?;
            }
            GraphChunk::Other { state_delta, .. } => {
                self.emit(
                    workflow_id,
                    EventType::AgentMessage,
                    format!("{node} updated state"),
                    &node,
                    Some(state_delta.clone()),
                    None,
                )
                .await?;
            }
            GraphChunk::Interrupt { .. } => unreachable!("interrupts are handled before this point"),
        }

        WorkflowRepository::update_current_stage(&self.pool, &id_str, &node).await?;
        self.emit(workflow_id, EventType::StageCompleted, format!("{node} completed"), &node, None, None)
            .await?;
        Ok(())
    }

    /// Syncs the checkpoint plan into `plan_cache`, classifies the gate the
    /// graph paused at, emits `APPROVAL_REQUIRED`, and transitions to
    /// `blocked` (spec.md §4.4.2).
    async fn handle_interrupt(
        &self,
        workflow_id: Uuid,
        executor: &dyn GraphExecutor,
        config: &GraphRunConfig,
        chunk: GraphChunk,
    ) -> Result<()> {
        let id_str = workflow_id.to_string();
        let payload = match chunk {
            GraphChunk::Interrupt { payload } => payload,
            _ => serde_json::Value::Null,
        };

        let state = executor.get_state(config).await?;
        WorkflowRepository::update_plan_cache(&self.pool, &id_str, &state.values).await?;

        let data = match gate::classify_gate(&state.next) {
            Some(kind) => json!({ "paused_at": kind.paused_at(), "payload": payload }),
            None => {
                tracing::warn!(workflow_id = %workflow_id, next = ?state.next, "interrupt at unrecognized gate node");
                json!({ "paused_at": serde_json::Value::Null, "payload": payload })
            }
        };

        self.emit(
            workflow_id,
            EventType::ApprovalRequired,
            "workflow paused for human input".into(),
            "system",
            Some(data),
            None,
        )
        .await?;
        WorkflowRepository::set_status(&self.pool, &id_str, WorkflowStatus::Blocked, None).await?;
        Ok(())
    }

    // ---- 4.4.3 Approval, rejection, blocker resolution -------------------

    pub async fn approve_workflow(self: &Arc<Self>, workflow_id: Uuid) -> Result<()> {
        let _guard = self.approval_lock.lock().await;
        let workflow = self.require_blocked(workflow_id).await?;
        let id_str = workflow_id.to_string();

        self.emit(workflow_id, EventType::ApprovalGranted, "plan approved".into(), "system", None, None)
            .await?;
        WorkflowRepository::set_status(&self.pool, &id_str, WorkflowStatus::InProgress, None).await?;

        let executor = self.graph_factory.build_graph(&gate::interrupt_before_nodes()).await?;
        let config = GraphRunConfig { thread_id: id_str };
        executor.update_state(&config, json!({ "human_approved": true })).await?;

        self.resume_supervisor(workflow_id, workflow.worktree_path);
        Ok(())
    }

    pub async fn reject_workflow(self: &Arc<Self>, workflow_id: Uuid, feedback: String) -> Result<()> {
        let _guard = self.approval_lock.lock().await;
        let workflow = self.require_blocked(workflow_id).await?;
        let id_str = workflow_id.to_string();

        self.emit(workflow_id, EventType::ApprovalRejected, feedback.clone(), "system", None, None)
            .await?;
        WorkflowRepository::set_status(&self.pool, &id_str, WorkflowStatus::Failed, Some(&feedback)).await?;

        let executor = self.graph_factory.build_graph(&gate::interrupt_before_nodes()).await?;
        let config = GraphRunConfig { thread_id: id_str };
        executor.update_state(&config, json!({ "human_approved": false })).await?;

        // No supervisor task is parked awaiting resume in this implementation
        // (it already exited when it raised the interrupt); this is a
        // defensive no-op unless a race left an entry registered.
        self.cancel_active_task(&workflow.worktree_path);
        Ok(())
    }

    pub async fn resolve_blocker(
        self: &Arc<Self>,
        workflow_id: Uuid,
        action: BlockerAction,
        feedback: Option<String>,
    ) -> Result<()> {
        let _guard = self.approval_lock.lock().await;
        let workflow = self.require_blocked(workflow_id).await?;
        let id_str = workflow_id.to_string();

        let resolution = gate::blocker_resolution_value(action, feedback.as_deref());
        WorkflowRepository::set_status(&self.pool, &id_str, WorkflowStatus::InProgress, None).await?;

        let executor = self.graph_factory.build_graph(&gate::interrupt_before_nodes()).await?;
        let config = GraphRunConfig { thread_id: id_str };
        executor.update_state(&config, json!({ "blocker_resolution": resolution })).await?;

        self.resume_supervisor(workflow_id, workflow.worktree_path);
        Ok(())
    }

    async fn require_blocked(&self, workflow_id: Uuid) -> Result<Workflow> {
        let id_str = workflow_id.to_string();
        let workflow = WorkflowRepository::get_by_id(&self.pool, &id_str)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(id_str.clone()))?;
        if workflow.status != WorkflowStatus::Blocked {
            return Err(OrchestratorError::InvalidState(format!(
                "workflow {workflow_id} is not blocked (status: {})",
                workflow.status
            )));
        }
        Ok(workflow)
    }

    fn resume_supervisor(self: &Arc<Self>, workflow_id: Uuid, worktree_path: String) {
        let handle = self.spawn_supervisor(workflow_id, worktree_path.clone(), false);
        self.active.lock().insert(worktree_path, ActiveTask { workflow_id, handle });
    }

    // ---- 4.4.5 Cancellation and crash recovery ---------------------------

    pub async fn cancel_workflow(&self, workflow_id: Uuid, reason: &str) -> Result<()> {
        let id_str = workflow_id.to_string();
        let workflow = WorkflowRepository::get_by_id(&self.pool, &id_str)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(id_str.clone()))?;
        if workflow.status.is_terminal() {
            return Err(OrchestratorError::InvalidState(format!(
                "workflow {workflow_id} already {}",
                workflow.status
            )));
        }

        self.cancel_active_task_by_workflow(workflow_id);
        self.emit(workflow_id, EventType::WorkflowCancelled, reason.to_string(), "system", None, None)
            .await?;
        WorkflowRepository::set_status(&self.pool, &id_str, WorkflowStatus::Cancelled, Some(reason)).await?;
        Ok(())
    }

    /// Cancels every active supervisor and awaits each with `timeout`,
    /// then flushes the event bus. Used during graceful shutdown.
    pub async fn cancel_all(&self, timeout: Duration) {
        let tasks: Vec<ActiveTask> = {
            let mut active = self.active.lock();
            std::mem::take(&mut *active).into_values().collect()
        };
        for task in tasks {
            task.handle.abort();
            let _ = tokio::time::timeout(timeout, task.handle).await;
        }
        self.sequence_locks.clear();
        self.event_bus.cleanup().await;
    }

    fn cancel_active_task(&self, worktree_path: &str) {
        let mut active = self.active.lock();
        if let Some(task) = active.remove(worktree_path) {
            task.handle.abort();
            self.sequence_locks.remove(&task.workflow_id);
        }
    }

    fn cancel_active_task_by_workflow(&self, workflow_id: Uuid) {
        let mut active = self.active.lock();
        let path = active.iter().find(|(_, t)| t.workflow_id == workflow_id).map(|(p, _)| p.clone());
        if let Some(path) = path {
            if let Some(task) = active.remove(&path) {
                task.handle.abort();
            }
        }
        drop(active);
        self.sequence_locks.remove(&workflow_id);
    }

    /// On startup: fails any `in_progress` workflow (the process that was
    /// running it is gone) and re-announces `blocked` ones so reconnecting
    /// clients see the pending gate again (spec.md §4.4.5).
    pub async fn recover_interrupted_workflows(&self) -> Result<()> {
        for workflow in WorkflowRepository::find_by_status(&self.pool, WorkflowStatus::InProgress).await? {
            let id_str = workflow.id.to_string();
            self.emit(
                workflow.id,
                EventType::WorkflowFailed,
                "server restarted while workflow was running".into(),
                "system",
                Some(json!({ "recoverable": true })),
                None,
            )
            .await?;
            WorkflowRepository::set_status(
                &self.pool,
                &id_str,
                WorkflowStatus::Failed,
                Some("Server restarted while workflow was running"),
            )
            .await?;
        }

        for workflow in WorkflowRepository::find_by_status(&self.pool, WorkflowStatus::Blocked).await? {
            self.emit(
                workflow.id,
                EventType::ApprovalRequired,
                "workflow still awaiting approval after restart".into(),
                "system",
                Some(json!({ "paused_at": workflow.current_stage })),
                None,
            )
            .await?;
        }

        Ok(())
    }

    /// Explicit operator action to restart a `failed` workflow from its
    /// saved checkpoint (spec.md §4.4.5).
    pub async fn resume_workflow(self: &Arc<Self>, workflow_id: Uuid) -> Result<()> {
        let id_str = workflow_id.to_string();
        let workflow = WorkflowRepository::get_by_id(&self.pool, &id_str)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(id_str.clone()))?;
        if workflow.status != WorkflowStatus::Failed {
            return Err(OrchestratorError::InvalidState(format!(
                "workflow {workflow_id} is not failed (status: {})",
                workflow.status
            )));
        }

        let _guard = self.start_lock.lock().await;
        {
            let active = self.active.lock();
            if active.contains_key(&workflow.worktree_path) {
                return Err(OrchestratorError::WorktreeConflict(workflow.worktree_path.clone()));
            }
        }

        WorkflowRepository::clear_for_resume(&self.pool, &id_str).await?;
        self.resume_supervisor(workflow_id, workflow.worktree_path);
        Ok(())
    }

    // ---- health-watchdog accessors ---------------------------------------

    pub async fn active_worktrees(&self) -> Result<Vec<String>> {
        Ok(self.active.lock().keys().cloned().collect())
    }

    pub async fn workflow_by_worktree(&self, worktree_path: &str) -> Result<Option<Workflow>> {
        Ok(WorkflowRepository::get_active_by_worktree(&self.pool, worktree_path).await?)
    }

    // ---- 4.4.6 Event emission ---------------------------------------------

    /// Assigns the next sequence number under a per-workflow lock, saves
    /// persisted event types, and always broadcasts over the event bus
    /// (trace-level/non-persisted events go out via `emit_stream` instead).
    async fn emit(
        &self,
        workflow_id: Uuid,
        event_type: EventType,
        message: String,
        agent: &str,
        data: Option<serde_json::Value>,
        correlation_id: Option<Uuid>,
    ) -> Result<()> {
        let id_str = workflow_id.to_string();
        let lock = self
            .sequence_locks
            .entry(workflow_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(0)))
            .clone();

        let sequence = {
            let mut seq = lock.lock().await;
            if *seq == 0 {
                *seq = EventRepository::get_max_event_sequence(&self.pool, &id_str).await?.unwrap_or(0);
            }
            *seq += 1;
            *seq
        };

        let level = event_type.default_level();
        let event = Event {
            id: Uuid::new_v4(),
            workflow_id,
            sequence,
            timestamp: chrono::Utc::now(),
            agent: agent.to_string(),
            event_type: event_type.clone(),
            level,
            message,
            data,
            is_error: matches!(level, crate::domain::event::EventLevel::Error),
            correlation_id,
        };

        if event_type.is_persisted() {
            EventRepository::save_event(&self.pool, &event).await?;
            self.event_bus.emit(event);
        } else {
            self.event_bus.emit_stream(&event);
        }
        Ok(())
    }
}

async fn validate_worktree(worktree_path: &str) -> Result<()> {
    let path = std::path::PathBuf::from(worktree_path);
    let healthy = tokio::task::spawn_blocking(move || path.exists() && path.is_dir() && path.join(".git").exists())
        .await
        .unwrap_or(false);
    if healthy {
        Ok(())
    } else {
        Err(OrchestratorError::InvalidWorktree(worktree_path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::DatabaseConnection;
    use crate::graph::fake::ScriptedGraphExecutorFactory;

    async fn test_orchestrator_with_chunks(chunks: Vec<GraphChunk>) -> (Arc<Orchestrator>, tempfile::TempDir) {
        // A single-connection pool: a multi-connection pool against
        // `sqlite::memory:` hands out an independent empty database per
        // connection, which would make cross-query state invisible here.
        let conn = DatabaseConnection::with_max_connections("sqlite::memory:", 1).await.unwrap();
        conn.run_migrations().await.unwrap();
        let bus = Arc::new(EventBus::new(None));
        let factory = Arc::new(ScriptedGraphExecutorFactory::new(chunks));
        let orchestrator = Arc::new(Orchestrator::new(
            conn.pool().clone(),
            bus,
            factory,
            4,
            RetryConfig::default(),
        ));
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        (orchestrator, dir)
    }

    async fn test_orchestrator() -> (Arc<Orchestrator>, tempfile::TempDir) {
        test_orchestrator_with_chunks(vec![]).await
    }

    async fn wait_for_status(orchestrator: &Orchestrator, workflow_id: Uuid, status: WorkflowStatus) -> bool {
        for _ in 0..50 {
            if let Some(w) = WorkflowRepository::get_by_id(&orchestrator.pool, &workflow_id.to_string())
                .await
                .unwrap()
            {
                if w.status == status {
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn start_workflow_runs_to_completion_with_empty_script() {
        let (orchestrator, dir) = test_orchestrator().await;
        let worktree = dir.path().to_str().unwrap().to_string();

        let workflow = orchestrator
            .start_workflow("ISSUE-1".into(), worktree, WorkflowType::Full, "default".into())
            .await
            .unwrap();

        assert!(wait_for_status(&orchestrator, workflow.id, WorkflowStatus::Completed).await);
    }

    #[tokio::test]
    async fn start_workflow_rejects_invalid_worktree() {
        let (orchestrator, _dir) = test_orchestrator().await;
        let err = orchestrator
            .start_workflow("ISSUE-1".into(), "/nonexistent/path".into(), WorkflowType::Full, "default".into())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidWorktree(_)));
    }

    #[tokio::test]
    async fn second_start_on_same_worktree_conflicts_once_first_is_blocked() {
        // The in-memory active-tasks entry is released as soon as the first
        // workflow's supervisor task exits (including on interrupt); once
        // blocked, the worktree-uniqueness guarantee is enforced by the
        // partial unique index instead, surfaced as a constraint-violation
        // translated back to `WorktreeConflict`.
        let interrupting_script = vec![GraphChunk::Interrupt { payload: serde_json::json!({"reason": "gate"}) }];
        let (orchestrator, dir) = test_orchestrator_with_chunks(interrupting_script).await;
        let worktree = dir.path().to_str().unwrap().to_string();

        let first = orchestrator
            .start_workflow("ISSUE-1".into(), worktree.clone(), WorkflowType::Full, "default".into())
            .await
            .unwrap();
        assert!(wait_for_status(&orchestrator, first.id, WorkflowStatus::Blocked).await);

        let second = orchestrator
            .start_workflow("ISSUE-2".into(), worktree, WorkflowType::Full, "default".into())
            .await;
        assert!(matches!(second, Err(OrchestratorError::WorktreeConflict(_))));
    }

    #[tokio::test]
    async fn cancel_workflow_fails_on_terminal_status() {
        let (orchestrator, dir) = test_orchestrator().await;
        let worktree = dir.path().to_str().unwrap().to_string();
        let workflow = orchestrator
            .start_workflow("ISSUE-1".into(), worktree, WorkflowType::Full, "default".into())
            .await
            .unwrap();

        assert!(wait_for_status(&orchestrator, workflow.id, WorkflowStatus::Completed).await);

        let err = orchestrator.cancel_workflow(workflow.id, "too late").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidState(_)));
    }

    #[tokio::test]
    async fn approve_workflow_resumes_and_completes() {
        let interrupting_script = vec![
            GraphChunk::Interrupt { payload: serde_json::json!({"reason": "gate"}) },
        ];
        let (orchestrator, dir) = test_orchestrator_with_chunks(interrupting_script).await;
        let worktree = dir.path().to_str().unwrap().to_string();

        let workflow = orchestrator
            .start_workflow("ISSUE-1".into(), worktree, WorkflowType::Full, "default".into())
            .await
            .unwrap();
        assert!(wait_for_status(&orchestrator, workflow.id, WorkflowStatus::Blocked).await);

        orchestrator.approve_workflow(workflow.id).await.unwrap();
        // The resumed run replays the same scripted chunks, hits the
        // interrupt again, and re-blocks rather than completing.
        assert!(wait_for_status(&orchestrator, workflow.id, WorkflowStatus::Blocked).await);
    }
}
