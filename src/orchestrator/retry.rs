//! Retry policy for the per-workflow supervisor loop (spec.md §4.4.4),
//! grounded on the teacher's `executor/retry.rs` backoff formula.

use serde::{Deserialize, Serialize};

use crate::graph::GraphError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, base_delay_ms: 1_000, max_delay_ms: 30_000 }
    }
}

impl RetryConfig {
    /// `min(base_delay * 2^(attempt-1), max_delay)`, `attempt` is 1-indexed.
    pub fn backoff_delay(&self, attempt: u32) -> std::time::Duration {
        let scaled = self.base_delay_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(32));
        std::time::Duration::from_millis(scaled.min(self.max_delay_ms))
    }
}

/// Whether a [`GraphError`] should be retried or fails the workflow outright.
pub fn is_transient(error: &GraphError) -> bool {
    error.is_transient()
}
