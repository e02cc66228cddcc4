//! Domain error taxonomy.
//!
//! Mirrors spec.md §7. Every variant carries a stable, machine-readable
//! `code()` used by the API layer to build the uniform `{error, code,
//! details?}` response shape.

use thiserror::Error;

/// Result type for orchestrator-domain operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Domain-level error taxonomy (spec.md §7).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Worktree path does not exist, is not a directory, or has no `.git` entry.
    #[error("invalid worktree: {0}")]
    InvalidWorktree(String),

    /// Another workflow already holds this worktree in an active state.
    #[error("worktree conflict: {0}")]
    WorktreeConflict(String),

    /// Global active-workflow ceiling reached.
    #[error("concurrency limit reached ({current}/{max})")]
    ConcurrencyLimit { current: usize, max: usize },

    /// Requested transition not allowed from the workflow's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// State-machine violation raised by the repository.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Unknown workflow or event id.
    #[error("not found: {0}")]
    NotFound(String),

    /// External policy hook rejected admission.
    #[error("policy denied: {0}")]
    PolicyDenied(String),

    /// Request body failed schema/sanity checks.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Underlying storage error.
    #[error("repository error: {0}")]
    Repository(#[from] crate::db::error::DbError),

    /// Graph executor error that escaped the retry policy.
    #[error("graph execution failed: {0}")]
    ExecutionFailed(String),

    /// Catch-all for anything else (logged with its source at the call site).
    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Stable machine-readable error code, used in API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidWorktree(_) => "InvalidWorktree",
            Self::WorktreeConflict(_) => "WorktreeConflict",
            Self::ConcurrencyLimit { .. } => "ConcurrencyLimit",
            Self::InvalidState(_) => "InvalidState",
            Self::InvalidTransition { .. } => "InvalidTransition",
            Self::NotFound(_) => "NotFound",
            Self::PolicyDenied(_) => "PolicyDenied",
            Self::ValidationError(_) => "ValidationError",
            Self::Repository(_) => "InternalError",
            Self::ExecutionFailed(_) => "InternalError",
            Self::Internal(_) => "InternalError",
        }
    }
}
