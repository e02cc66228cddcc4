//! Human-gate node classification (spec.md §4.4.2, §4.4.3).

/// The three nodes the graph is compiled with `interrupt_before`.
pub const HUMAN_APPROVAL_NODE: &str = "human_approval_node";
pub const BATCH_APPROVAL_NODE: &str = "batch_approval_node";
pub const BLOCKER_RESOLUTION_NODE: &str = "blocker_resolution_node";

pub fn interrupt_before_nodes() -> Vec<String> {
    vec![
        HUMAN_APPROVAL_NODE.to_string(),
        BATCH_APPROVAL_NODE.to_string(),
        BLOCKER_RESOLUTION_NODE.to_string(),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    Approval,
    BatchApproval,
    Blocker,
}

impl GateKind {
    pub fn paused_at(self) -> &'static str {
        match self {
            GateKind::Approval => HUMAN_APPROVAL_NODE,
            GateKind::BatchApproval => BATCH_APPROVAL_NODE,
            GateKind::Blocker => BLOCKER_RESOLUTION_NODE,
        }
    }
}

/// Classifies which gate the graph paused at from `get_state().next`.
pub fn classify_gate(next: &[String]) -> Option<GateKind> {
    if next.iter().any(|n| n == HUMAN_APPROVAL_NODE) {
        Some(GateKind::Approval)
    } else if next.iter().any(|n| n == BATCH_APPROVAL_NODE) {
        Some(GateKind::BatchApproval)
    } else if next.iter().any(|n| n == BLOCKER_RESOLUTION_NODE) {
        Some(GateKind::Blocker)
    } else {
        None
    }
}

/// Maps a blocker-resolution action to the string the graph's blocker node
/// expects (spec.md §4.4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockerAction {
    Skip,
    Retry,
    Abort,
    AbortRevert,
    Fix,
}

pub fn blocker_resolution_value(action: BlockerAction, feedback: Option<&str>) -> String {
    match action {
        BlockerAction::Skip => "skip".to_string(),
        BlockerAction::Abort => "abort".to_string(),
        BlockerAction::AbortRevert => "abort_revert".to_string(),
        BlockerAction::Retry => String::new(),
        BlockerAction::Fix => feedback.unwrap_or_default().to_string(),
    }
}
