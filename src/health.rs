//! Periodic worktree health checking (spec.md §4.5), grounded on
//! `original_source/amelia/server/lifecycle/health_checker.py`. Checks run
//! on `tokio::task::spawn_blocking`, standing in for the source's
//! `asyncio.to_thread`, to avoid blocking the runtime on a slow or
//! network filesystem.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::orchestrator::Orchestrator;

pub struct WorktreeHealthChecker {
    orchestrator: Arc<Orchestrator>,
    check_interval: Duration,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl WorktreeHealthChecker {
    pub fn new(orchestrator: Arc<Orchestrator>, check_interval: Duration) -> Self {
        Self { orchestrator, check_interval, task: parking_lot::Mutex::new(None) }
    }

    pub fn start(self: &Arc<Self>) {
        let this = self.clone();
        let handle = tokio::spawn(async move { this.check_loop().await });
        *self.task.lock() = Some(handle);
        tracing::info!(interval_secs = self.check_interval.as_secs(), "worktree health checker started");
    }

    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            tracing::info!("worktree health checker stopped");
        }
    }

    async fn check_loop(self: Arc<Self>) {
        loop {
            tokio::time::sleep(self.check_interval).await;
            if let Err(err) = self.check_all_worktrees().await {
                tracing::error!(error = %err, "health check failed, continuing loop");
            }
        }
    }

    async fn check_all_worktrees(&self) -> crate::error::Result<()> {
        for worktree_path in self.orchestrator.active_worktrees().await? {
            if !is_worktree_healthy(&worktree_path).await {
                if let Some(workflow) = self.orchestrator.workflow_by_worktree(&worktree_path).await? {
                    tracing::warn!(
                        worktree_path = %worktree_path,
                        workflow_id = %workflow.id,
                        "worktree deleted, cancelling workflow"
                    );
                    self.orchestrator
                        .cancel_workflow(workflow.id, "worktree directory no longer exists")
                        .await?;
                }
            }
        }
        Ok(())
    }
}

fn check_worktree_sync(path: &Path) -> bool {
    path.exists() && path.is_dir() && path.join(".git").exists()
}

async fn is_worktree_healthy(worktree_path: &str) -> bool {
    let path = PathBuf::from(worktree_path);
    tokio::task::spawn_blocking(move || check_worktree_sync(&path)).await.unwrap_or(false)
}
