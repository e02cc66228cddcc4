//! Scripted [`GraphExecutor`] test double driving supervisor-loop tests
//! without a real graph backend.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;

use super::{GraphError, GraphExecutor, GraphExecutorFactory, GraphRunConfig, GraphState};
use crate::domain::graph_chunk::GraphChunk;
use crate::error::Result;

/// Replays a fixed chunk sequence once per `stream()` call, ignoring
/// `initial_state`. `get_state`/`update_state` record calls for assertions.
pub struct ScriptedGraphExecutor {
    chunks: Vec<GraphChunk>,
    state: Mutex<serde_json::Value>,
    updates: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedGraphExecutor {
    pub fn new(chunks: Vec<GraphChunk>) -> Self {
        Self {
            chunks,
            state: Mutex::new(serde_json::json!({})),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_updates(&self) -> Vec<serde_json::Value> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl GraphExecutor for ScriptedGraphExecutor {
    async fn stream(
        &self,
        _initial_state: Option<serde_json::Value>,
        _config: &GraphRunConfig,
    ) -> Result<BoxStream<'static, std::result::Result<GraphChunk, GraphError>>> {
        let chunks = self.chunks.clone();
        Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }

    async fn get_state(&self, _config: &GraphRunConfig) -> Result<GraphState> {
        Ok(GraphState { values: self.state.lock().clone(), next: Vec::new() })
    }

    async fn update_state(&self, _config: &GraphRunConfig, patch: serde_json::Value) -> Result<()> {
        self.updates.lock().push(patch);
        Ok(())
    }
}

/// Hands out the same [`ScriptedGraphExecutor`] script to every workflow.
pub struct ScriptedGraphExecutorFactory {
    chunks: Vec<GraphChunk>,
}

impl ScriptedGraphExecutorFactory {
    pub fn new(chunks: Vec<GraphChunk>) -> Self {
        Self { chunks }
    }
}

#[async_trait]
impl GraphExecutorFactory for ScriptedGraphExecutorFactory {
    async fn build_graph(&self, _interrupt_before: &[String]) -> Result<Box<dyn GraphExecutor>> {
        Ok(Box::new(ScriptedGraphExecutor::new(self.chunks.clone())) as Box<dyn GraphExecutor>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_executor_replays_fixed_chunks() {
        let chunks = vec![GraphChunk::Interrupt { payload: serde_json::json!({"reason": "test"}) }];
        let executor = ScriptedGraphExecutor::new(chunks);
        let config = GraphRunConfig { thread_id: "t1".into() };
        let mut stream = executor.stream(None, &config).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert!(first.is_interrupt());
    }

    #[tokio::test]
    async fn update_state_records_patches() {
        let executor = ScriptedGraphExecutor::new(vec![]);
        let config = GraphRunConfig { thread_id: "t1".into() };
        executor.update_state(&config, serde_json::json!({"human_approved": true})).await.unwrap();
        assert_eq!(executor.recorded_updates().len(), 1);
    }
}
