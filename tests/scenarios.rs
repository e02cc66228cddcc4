//! End-to-end scenarios (spec.md §8 "Concrete end-to-end scenarios"),
//! driven against the real [`Orchestrator`] with a scripted graph executor
//! standing in for the upstream dependency.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use conductor::bus::EventBus;
use conductor::db::connection::DatabaseConnection;
use conductor::db::repositories::{EventRepository, WorkflowRepository};
use conductor::domain::event::EventType;
use conductor::domain::graph_chunk::GraphChunk;
use conductor::domain::status::WorkflowStatus;
use conductor::domain::workflow::{Workflow, WorkflowType};
use conductor::error::OrchestratorError;
use conductor::graph::{GraphError, GraphExecutor, GraphExecutorFactory, GraphRunConfig, GraphState, TransientCause};
use conductor::orchestrator::{Orchestrator, RetryConfig};

use common::{test_orchestrator, test_orchestrator_with_chunks, wait_for_status, worktree_path};

fn architect_chunk() -> GraphChunk {
    GraphChunk::Architect {
        plan_summary: "plan ready".into(),
        plan_markdown: "# Plan".into(),
        key_files: vec!["src/lib.rs".into()],
        task_count: 3,
    }
}

fn interrupt_chunk() -> GraphChunk {
    GraphChunk::Interrupt { payload: serde_json::json!({"reason": "human_approval_node"}) }
}

/// Scenario 1 (partial): architect stage events fire, the graph pauses
/// before the approval gate, `plan_cache` is populated, and `blocked` is
/// reached with no completion event.
#[tokio::test]
async fn approval_gate_blocks_with_plan_cache() {
    let (orchestrator, conn, dir) =
        test_orchestrator_with_chunks(vec![architect_chunk(), interrupt_chunk()]).await;
    let worktree = worktree_path(&dir);

    let workflow = orchestrator
        .start_workflow("ISSUE-1".into(), worktree, WorkflowType::Full, "default".into())
        .await
        .unwrap();

    assert!(wait_for_status(&conn, workflow.id, WorkflowStatus::Blocked).await);

    let stored = WorkflowRepository::get_by_id(conn.pool(), &workflow.id.to_string()).await.unwrap().unwrap();
    assert!(stored.plan_cache.is_some());

    let events = EventRepository::get_recent_events(conn.pool(), &workflow.id.to_string(), 50).await.unwrap();
    let types: Vec<&EventType> = events.iter().map(|e| &e.event_type).collect();
    assert!(types.contains(&&EventType::WorkflowStarted));
    assert!(types.contains(&&EventType::StageStarted));
    assert!(types.contains(&&EventType::StageCompleted));
    assert!(types.contains(&&EventType::ApprovalRequired));
    assert!(!types.contains(&&EventType::WorkflowCompleted));
}

/// Scenario 1 (happy path without a gate): a script with no interrupt
/// runs straight through to `completed`.
#[tokio::test]
async fn happy_path_without_a_gate_completes() {
    let (orchestrator, conn, dir) = test_orchestrator().await;
    let worktree = worktree_path(&dir);

    let workflow = orchestrator
        .start_workflow("ISSUE-1".into(), worktree, WorkflowType::Full, "default".into())
        .await
        .unwrap();

    assert!(wait_for_status(&conn, workflow.id, WorkflowStatus::Completed).await);

    let stored = WorkflowRepository::get_by_id(conn.pool(), &workflow.id.to_string()).await.unwrap().unwrap();
    assert!(stored.completed_at.is_some());
}

/// Scenario 2: two workflows submitted against the same worktree without
/// waiting; the second is rejected as soon as the first takes the slot.
#[tokio::test]
async fn worktree_conflict_on_second_submission() {
    let (orchestrator, conn, dir) = test_orchestrator_with_chunks(vec![interrupt_chunk()]).await;
    let worktree = worktree_path(&dir);

    let first = orchestrator
        .start_workflow("ISSUE-1".into(), worktree.clone(), WorkflowType::Full, "default".into())
        .await
        .unwrap();
    assert!(wait_for_status(&conn, first.id, WorkflowStatus::Blocked).await);

    let second = orchestrator.start_workflow("ISSUE-2".into(), worktree, WorkflowType::Full, "default".into()).await;
    assert!(matches!(second, Err(OrchestratorError::WorktreeConflict(_))));
}

/// A [`GraphExecutor`] that fails transiently on its first `stream()` call
/// and completes cleanly on every call after, for exercising the retry
/// policy without a real upstream graph executor.
struct FlakyGraphExecutor {
    attempts: AtomicUsize,
}

#[async_trait]
impl GraphExecutor for FlakyGraphExecutor {
    async fn stream(
        &self,
        _initial_state: Option<serde_json::Value>,
        _config: &GraphRunConfig,
    ) -> conductor::error::Result<BoxStream<'static, std::result::Result<GraphChunk, GraphError>>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt == 0 {
            Ok(stream::iter(vec![Err(GraphError::Transient {
                cause: TransientCause::LlmClientTimeout,
                message: "upstream timed out".into(),
            })])
            .boxed())
        } else {
            Ok(stream::iter(Vec::<std::result::Result<GraphChunk, GraphError>>::new()).boxed())
        }
    }

    async fn get_state(&self, _config: &GraphRunConfig) -> conductor::error::Result<GraphState> {
        Ok(GraphState { values: serde_json::json!({}), next: Vec::new() })
    }

    async fn update_state(&self, _config: &GraphRunConfig, _patch: serde_json::Value) -> conductor::error::Result<()> {
        Ok(())
    }
}

struct FlakyGraphExecutorFactory;

#[async_trait]
impl GraphExecutorFactory for FlakyGraphExecutorFactory {
    async fn build_graph(&self, _interrupt_before: &[String]) -> conductor::error::Result<Box<dyn GraphExecutor>> {
        // The supervisor calls `build_graph` once per workflow and reuses
        // the returned executor across all of its retry attempts, so one
        // counter here is enough to distinguish attempt 1 from attempt 2.
        Ok(Box::new(FlakyGraphExecutor { attempts: AtomicUsize::new(0) }))
    }
}

/// Scenario 3: the graph raises a transient timeout on the first attempt
/// and succeeds on the second. No `WORKFLOW_FAILED`, exactly one
/// `WORKFLOW_COMPLETED`, `consecutive_errors` back to 0.
#[tokio::test]
async fn retry_then_succeed() {
    let conn = DatabaseConnection::with_max_connections("sqlite::memory:", 1).await.unwrap();
    conn.run_migrations().await.unwrap();
    let bus = Arc::new(EventBus::new(None));
    let factory = Arc::new(FlakyGraphExecutorFactory);
    let retry = RetryConfig { max_retries: 2, base_delay_ms: 10, max_delay_ms: 50 };
    let orchestrator = Arc::new(Orchestrator::new(conn.pool().clone(), bus, factory, 4, retry));

    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();

    let workflow = orchestrator
        .start_workflow("ISSUE-1".into(), worktree_path(&dir), WorkflowType::Full, "default".into())
        .await
        .unwrap();

    assert!(wait_for_status(&conn, workflow.id, WorkflowStatus::Completed).await);

    let events = EventRepository::get_recent_events(conn.pool(), &workflow.id.to_string(), 50).await.unwrap();
    let completed = events.iter().filter(|e| e.event_type == EventType::WorkflowCompleted).count();
    assert_eq!(completed, 1);
    assert!(!events.iter().any(|e| e.event_type == EventType::WorkflowFailed));

    let stored = WorkflowRepository::get_by_id(conn.pool(), &workflow.id.to_string()).await.unwrap().unwrap();
    assert_eq!(stored.consecutive_errors, 0);
}

/// Scenario 4: reject with feedback fails the workflow and records the
/// feedback as the failure reason.
#[tokio::test]
async fn reject_records_feedback_as_failure_reason() {
    let (orchestrator, conn, dir) = test_orchestrator_with_chunks(vec![interrupt_chunk()]).await;
    let worktree = worktree_path(&dir);

    let workflow = orchestrator
        .start_workflow("ISSUE-1".into(), worktree, WorkflowType::Full, "default".into())
        .await
        .unwrap();
    assert!(wait_for_status(&conn, workflow.id, WorkflowStatus::Blocked).await);

    orchestrator.reject_workflow(workflow.id, "needs rework".into()).await.unwrap();

    let stored = WorkflowRepository::get_by_id(conn.pool(), &workflow.id.to_string()).await.unwrap().unwrap();
    assert_eq!(stored.status, WorkflowStatus::Failed);
    assert_eq!(stored.failure_reason.as_deref(), Some("needs rework"));

    let events = EventRepository::get_recent_events(conn.pool(), &workflow.id.to_string(), 50).await.unwrap();
    assert!(events.iter().any(|e| e.event_type == EventType::ApprovalRejected));
}

/// Scenario 5: a client that last saw event 5 backfills exactly the
/// events after it, in order, exercised at the repository layer the
/// `/ws/events` backfill path is built on.
#[tokio::test]
async fn backfill_replays_events_strictly_after_the_given_one() {
    let (orchestrator, conn, dir) =
        test_orchestrator_with_chunks(vec![architect_chunk(), interrupt_chunk()]).await;
    let worktree = worktree_path(&dir);

    let workflow = orchestrator
        .start_workflow("ISSUE-1".into(), worktree, WorkflowType::Full, "default".into())
        .await
        .unwrap();
    assert!(wait_for_status(&conn, workflow.id, WorkflowStatus::Blocked).await);

    let events = EventRepository::get_recent_events(conn.pool(), &workflow.id.to_string(), 50).await.unwrap();
    assert!(events.len() >= 3, "expected at least a few events before the gate");
    let midpoint = &events[events.len() / 2];

    let after = EventRepository::get_events_after(conn.pool(), &workflow.id.to_string(), midpoint.sequence)
        .await
        .unwrap();

    assert!(after.iter().all(|e| e.sequence > midpoint.sequence));
    assert_eq!(after.len(), events.len() - (events.len() / 2) - 1);
}

/// Scenario 6: an `in_progress` workflow is failed with a restart reason
/// on startup; a `blocked` one survives untouched except for a fresh
/// `APPROVAL_REQUIRED` announcement.
#[tokio::test]
async fn crash_recovery_fails_in_progress_and_rebits_blocked() {
    let conn = DatabaseConnection::with_max_connections("sqlite::memory:", 1).await.unwrap();
    conn.run_migrations().await.unwrap();

    let mut running = Workflow::new("ISSUE-1".into(), "/tmp/wf-running".into(), WorkflowType::Full, "default".into());
    running.status = WorkflowStatus::InProgress;
    WorkflowRepository::create(conn.pool(), &running).await.unwrap();

    let mut blocked = Workflow::new("ISSUE-2".into(), "/tmp/wf-blocked".into(), WorkflowType::Full, "default".into());
    blocked.status = WorkflowStatus::Blocked;
    blocked.current_stage = Some("human_approval_node".into());
    WorkflowRepository::create(conn.pool(), &blocked).await.unwrap();

    let bus = Arc::new(EventBus::new(None));
    let factory = Arc::new(conductor::graph::fake::ScriptedGraphExecutorFactory::new(vec![]));
    let orchestrator = Arc::new(Orchestrator::new(conn.pool().clone(), bus, factory, 4, RetryConfig::default()));

    orchestrator.recover_interrupted_workflows().await.unwrap();

    let recovered_running = WorkflowRepository::get_by_id(conn.pool(), &running.id.to_string()).await.unwrap().unwrap();
    assert_eq!(recovered_running.status, WorkflowStatus::Failed);
    assert!(recovered_running.failure_reason.unwrap().contains("restart"));

    let recovered_blocked = WorkflowRepository::get_by_id(conn.pool(), &blocked.id.to_string()).await.unwrap().unwrap();
    assert_eq!(recovered_blocked.status, WorkflowStatus::Blocked);

    let running_events = EventRepository::get_recent_events(conn.pool(), &running.id.to_string(), 10).await.unwrap();
    assert!(running_events.iter().any(|e| e.event_type == EventType::WorkflowFailed
        && e.data.as_ref().and_then(|d| d.get("recoverable")).and_then(|v| v.as_bool()) == Some(true)));

    let blocked_events = EventRepository::get_recent_events(conn.pool(), &blocked.id.to_string(), 10).await.unwrap();
    assert!(blocked_events.iter().any(|e| e.event_type == EventType::ApprovalRequired));
}
