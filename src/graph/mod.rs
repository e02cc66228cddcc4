//! Contract for the external graph executor (spec.md §6.4). This crate
//! drives a graph but does not implement one: any executor meeting this
//! trait suffices, the orchestrator treats it as opaque.

pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
pub mod ws_client;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub use error::{GraphError, TransientCause};
pub use ws_client::WsGraphExecutorFactory;

use crate::domain::graph_chunk::GraphChunk;
use crate::error::Result;

/// Identifies a single run for checkpointing/resumption purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRunConfig {
    pub thread_id: String,
}

/// Result of `graph.get_state(config)`: the current checkpoint values and
/// the nodes that would run next (empty once the graph has completed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphState {
    pub values: serde_json::Value,
    pub next: Vec<String>,
}

/// A compiled, runnable graph for one workflow thread.
#[async_trait]
pub trait GraphExecutor: Send + Sync {
    /// Streams node deltas and interrupt markers. `initial_state = None`
    /// resumes an interrupted run from its checkpoint instead of starting
    /// fresh.
    async fn stream(
        &self,
        initial_state: Option<serde_json::Value>,
        config: &GraphRunConfig,
    ) -> Result<BoxStream<'static, std::result::Result<GraphChunk, GraphError>>>;

    async fn get_state(&self, config: &GraphRunConfig) -> Result<GraphState>;

    /// Merges a partial update into the checkpoint — used to inject
    /// `human_approved` / `blocker_resolution` before resuming.
    async fn update_state(&self, config: &GraphRunConfig, patch: serde_json::Value) -> Result<()>;
}

/// Compiles a fresh [`GraphExecutor`] bound to a checkpoint store, pausing
/// before the named nodes (spec.md §6.4 `build_graph`).
#[async_trait]
pub trait GraphExecutorFactory: Send + Sync {
    async fn build_graph(&self, interrupt_before: &[String]) -> Result<Box<dyn GraphExecutor>>;
}
