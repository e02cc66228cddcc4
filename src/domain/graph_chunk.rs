//! Tagged-union model of a single chunk from the graph executor's output
//! stream (spec.md §9, Design Note 1; §6.4).
//!
//! The source distinguishes stage messages by inspecting untyped dicts by
//! node name. Here each node's delta is a variant carrying exactly the
//! payload the supervisor needs to derive its messages; `Other` tolerates
//! stages the orchestrator doesn't have special-cased handling for yet.

use serde::{Deserialize, Serialize};

/// A single item yielded by `graph.stream(..., stream_mode="updates")`
/// (spec.md §6.4): either a node update or an interrupt marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum GraphChunk {
    /// `{node_name: state_delta}` for the architect stage.
    Architect { plan_summary: String, plan_markdown: String, key_files: Vec<String>, task_count: u32 },
    /// `{node_name: state_delta}` for the developer stage.
    Developer { step_results: Vec<StepResult> },
    /// `{node_name: state_delta}` for the reviewer stage.
    Reviewer { review_summary: String, approved: bool },
    /// `{node_name: state_delta}` for a blocker-resolution node.
    BlockerNode { blocker_payload: serde_json::Value },
    /// Any node this orchestrator has no special handling for — still
    /// advances `current_stage` and emits generic stage events, but
    /// derives no agent-specific message (forward-compatible with new
    /// stages per spec.md §9).
    Other { node_name: String, state_delta: serde_json::Value },
    /// `{"__interrupt__": payload}` — pause before a human gate.
    Interrupt { payload: serde_json::Value },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub summary: String,
    pub succeeded: bool,
}

impl GraphChunk {
    pub fn node_name(&self) -> Option<&str> {
        match self {
            GraphChunk::Architect { .. } => Some("architect"),
            GraphChunk::Developer { .. } => Some("developer"),
            GraphChunk::Reviewer { .. } => Some("reviewer"),
            GraphChunk::BlockerNode { .. } => Some("blocker_resolution_node"),
            GraphChunk::Other { node_name, .. } => Some(node_name.as_str()),
            GraphChunk::Interrupt { .. } => None,
        }
    }

    pub fn is_interrupt(&self) -> bool {
        matches!(self, GraphChunk::Interrupt { .. })
    }
}
