//! Shared test harness for the integration suite, mirroring
//! `orchestrator::orchestrator`'s own `#[cfg(test)]` helpers so the
//! scenario/invariant tests drive the same setup the unit tests do.

use std::sync::Arc;
use std::time::Duration;

use conductor::bus::EventBus;
use conductor::db::connection::DatabaseConnection;
use conductor::domain::graph_chunk::GraphChunk;
use conductor::domain::status::WorkflowStatus;
use conductor::graph::fake::ScriptedGraphExecutorFactory;
use conductor::orchestrator::{Orchestrator, RetryConfig};

/// A single-connection in-memory pool: a multi-connection pool against
/// `sqlite::memory:` hands out an independent empty database per
/// connection, which would hide state written on another connection.
pub async fn test_orchestrator_with_chunks(
    chunks: Vec<GraphChunk>,
) -> (Arc<Orchestrator>, DatabaseConnection, tempfile::TempDir) {
    let conn = DatabaseConnection::with_max_connections("sqlite::memory:", 1).await.unwrap();
    conn.run_migrations().await.unwrap();
    let bus = Arc::new(EventBus::new(None));
    let factory = Arc::new(ScriptedGraphExecutorFactory::new(chunks));
    let orchestrator =
        Arc::new(Orchestrator::new(conn.pool().clone(), bus, factory, 4, RetryConfig::default()));
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();
    (orchestrator, conn, dir)
}

pub async fn test_orchestrator() -> (Arc<Orchestrator>, DatabaseConnection, tempfile::TempDir) {
    test_orchestrator_with_chunks(vec![]).await
}

pub fn worktree_path(dir: &tempfile::TempDir) -> String {
    dir.path().to_str().unwrap().to_string()
}

pub async fn wait_for_status(conn: &DatabaseConnection, workflow_id: uuid::Uuid, status: WorkflowStatus) -> bool {
    use conductor::db::repositories::WorkflowRepository;

    for _ in 0..100 {
        if let Some(w) = WorkflowRepository::get_by_id(conn.pool(), &workflow_id.to_string()).await.unwrap() {
            if w.status == status {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
