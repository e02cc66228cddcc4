//! Universally-quantified invariants and laws (spec.md §8), checked
//! against the real repositories and the orchestrator's event emission.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use proptest::prelude::*;

use conductor::db::connection::DatabaseConnection;
use conductor::db::cursor::Cursor;
use conductor::db::repositories::{TokenUsageRepository, WorkflowRepository};
use conductor::domain::event::EventType;
use conductor::domain::graph_chunk::GraphChunk;
use conductor::domain::status::WorkflowStatus;
use conductor::domain::token_usage::TokenUsage;
use conductor::domain::workflow::WorkflowType;
use uuid::Uuid;

use common::{test_orchestrator_with_chunks, wait_for_status, worktree_path};

/// Invariant 1: the set of event sequences written for a workflow is
/// exactly `{1, ..., max}` — no gaps, no duplicates — across a range of
/// script lengths (each `Other` chunk contributes 3 persisted events, plus
/// `WORKFLOW_STARTED` and `WORKFLOW_COMPLETED`).
fn run_contiguity_check(chunk_count: usize) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let chunks: Vec<GraphChunk> = (0..chunk_count)
            .map(|i| GraphChunk::Other { node_name: format!("stage_{i}"), state_delta: serde_json::json!({}) })
            .collect();
        let (orchestrator, conn, dir) = test_orchestrator_with_chunks(chunks).await;
        let worktree = worktree_path(&dir);

        let workflow = orchestrator
            .start_workflow("ISSUE-1".into(), worktree, WorkflowType::Full, "default".into())
            .await
            .unwrap();
        assert!(wait_for_status(&conn, workflow.id, WorkflowStatus::Completed).await);

        let events =
            conductor::db::repositories::EventRepository::get_recent_events(conn.pool(), &workflow.id.to_string(), 1000)
                .await
                .unwrap();

        let mut sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
        sequences.sort_unstable();
        let expected: Vec<u64> = (1..=sequences.len() as u64).collect();
        assert_eq!(sequences, expected, "sequences must be exactly {{1..max}} with no gaps or duplicates");
    });
}

proptest! {
    #[test]
    fn event_sequences_are_contiguous_for_any_script_length(chunk_count in 0usize..6) {
        run_contiguity_check(chunk_count);
    }
}

/// Invariant 3: persisted event types land in storage, `Other` (the only
/// non-persisted type) does not.
#[tokio::test]
async fn non_persisted_event_types_are_not_saved() {
    assert!(EventType::WorkflowStarted.is_persisted());
    assert!(EventType::ApprovalRequired.is_persisted());
    assert!(!EventType::Other.is_persisted());
}

/// Law: `get_token_summary(w).total_cost_usd == sum(usage.cost_usd for w)`.
#[tokio::test]
async fn token_summary_consistency() {
    let conn = DatabaseConnection::with_max_connections("sqlite::memory:", 1).await.unwrap();
    conn.run_migrations().await.unwrap();

    let workflow_id = Uuid::new_v4();
    seed_workflow(&conn, workflow_id).await;

    let costs = [1.25, 0.75, 3.5];
    for cost in costs {
        TokenUsageRepository::save_token_usage(conn.pool(), &sample_usage(workflow_id, cost)).await.unwrap();
    }

    let summary = TokenUsageRepository::get_token_summary(conn.pool(), &workflow_id.to_string())
        .await
        .unwrap()
        .unwrap();
    let expected: f64 = costs.iter().sum();
    assert!((summary.total_cost_usd - expected).abs() < 1e-9);
    assert_eq!(summary.num_invocations, costs.len() as i64);
}

/// Law: `get_token_summaries_batch([w1..wn])[wi] == get_token_summary(wi)`.
#[tokio::test]
async fn batch_summary_parity() {
    let conn = DatabaseConnection::with_max_connections("sqlite::memory:", 1).await.unwrap();
    conn.run_migrations().await.unwrap();

    let mut ids = Vec::new();
    for i in 0..3 {
        let workflow_id = Uuid::new_v4();
        seed_workflow(&conn, workflow_id).await;
        TokenUsageRepository::save_token_usage(conn.pool(), &sample_usage(workflow_id, 1.0 + i as f64))
            .await
            .unwrap();
        ids.push(workflow_id.to_string());
    }
    // One workflow with no recorded usage at all.
    let empty_id = Uuid::new_v4();
    seed_workflow(&conn, empty_id).await;
    ids.push(empty_id.to_string());

    let batch = TokenUsageRepository::get_token_summaries_batch(conn.pool(), &ids).await.unwrap();

    for id in &ids {
        let individual = TokenUsageRepository::get_token_summary(conn.pool(), id).await.unwrap();
        let batched = batch.get(id).cloned().flatten();
        match (individual, batched) {
            (Some(a), Some(b)) => assert!((a.total_cost_usd - b.total_cost_usd).abs() < 1e-9),
            (None, None) => {}
            other => panic!("batch and individual summaries disagree: {other:?}"),
        }
    }
}

/// Boundary: cursor pagination over-reads by one row to derive `has_more`
/// and returns exactly `limit` items with a `next_cursor` when truncated.
#[tokio::test]
async fn cursor_pagination_overreads_by_one_to_derive_has_more() {
    let conn = DatabaseConnection::with_max_connections("sqlite::memory:", 1).await.unwrap();
    conn.run_migrations().await.unwrap();

    let now = Utc::now();
    for i in 0..5 {
        let mut w = conductor::domain::workflow::Workflow::new(
            format!("ISSUE-{i}"),
            format!("/tmp/wf-{i}"),
            WorkflowType::Full,
            "default".into(),
        );
        w.started_at = Some(now - ChronoDuration::seconds(i as i64));
        WorkflowRepository::create(conn.pool(), &w).await.unwrap();
    }

    let page = WorkflowRepository::list_workflows(conn.pool(), None, None, 3).await.unwrap();
    assert_eq!(page.items.len(), 3);
    assert!(page.next_cursor.is_some());

    let decoded = Cursor::decode(page.next_cursor.as_deref().unwrap()).unwrap();
    let next_page = WorkflowRepository::list_workflows(conn.pool(), None, Some(&Cursor::encode(decoded.started_at, &decoded.id)), 3)
        .await
        .unwrap();
    assert_eq!(next_page.items.len(), 2);
    assert!(next_page.next_cursor.is_none());
}

/// Boundary: zero or negative `limit` on recent-event fetch returns an
/// empty result without touching storage semantics beyond `LIMIT 0`.
#[tokio::test]
async fn non_positive_recent_event_limit_returns_empty() {
    let (orchestrator, conn, dir) = test_orchestrator_with_chunks(vec![]).await;
    let worktree = worktree_path(&dir);
    let workflow = orchestrator
        .start_workflow("ISSUE-1".into(), worktree, WorkflowType::Full, "default".into())
        .await
        .unwrap();
    assert!(wait_for_status(&conn, workflow.id, WorkflowStatus::Completed).await);

    let events =
        conductor::db::repositories::EventRepository::get_recent_events(conn.pool(), &workflow.id.to_string(), 0)
            .await
            .unwrap();
    assert!(events.is_empty());
}

async fn seed_workflow(conn: &DatabaseConnection, workflow_id: Uuid) {
    let mut w = conductor::domain::workflow::Workflow::new(
        "ISSUE-seed".into(),
        format!("/tmp/{workflow_id}"),
        WorkflowType::Full,
        "default".into(),
    );
    w.id = workflow_id;
    WorkflowRepository::create(conn.pool(), &w).await.unwrap();
}

fn sample_usage(workflow_id: Uuid, cost: f64) -> TokenUsage {
    TokenUsage {
        id: Uuid::new_v4(),
        workflow_id,
        agent: "developer".into(),
        model: "test-model".into(),
        input_tokens: 100,
        output_tokens: 50,
        cache_read_tokens: 10,
        cache_creation_tokens: 0,
        cost_usd: cost,
        duration_ms: 1000,
        num_turns: 1,
        timestamp: Utc::now(),
    }
}
