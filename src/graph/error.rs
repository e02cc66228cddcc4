//! Classification of exceptions propagating from the graph executor
//! (spec.md §4.4.4). The transient cause set is a closed enum rather than
//! an open exception hierarchy — Rust has no catchable base exception type
//! to match against, and the set is a configuration point per profile
//! rather than something callers extend ad hoc, matching
//! `original_source/.../orchestrator/service.py`'s `TRANSIENT_EXCEPTIONS`
//! tuple.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientCause {
    Timeout,
    ConnectionReset,
    LlmClientTimeout,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("transient graph error ({cause:?}): {message}")]
    Transient { cause: TransientCause, message: String },
    #[error("permanent graph error: {0}")]
    Permanent(String),
}

impl GraphError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GraphError::Transient { .. })
    }
}
