//! The [`TokenUsage`] entity (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One record per agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub agent: String,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_read_tokens: i64,
    pub cache_creation_tokens: i64,
    pub cost_usd: f64,
    pub duration_ms: i64,
    pub num_turns: i64,
    pub timestamp: DateTime<Utc>,
}

impl TokenUsage {
    /// `cache_read_tokens <= input_tokens` — cache reads are a subset of input.
    pub fn is_valid(&self) -> bool {
        self.cache_read_tokens <= self.input_tokens
    }
}

/// Aggregated totals over a set of [`TokenUsage`] rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenSummary {
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub total_cache_read_tokens: i64,
    pub total_cache_creation_tokens: i64,
    pub total_cost_usd: f64,
    pub total_duration_ms: i64,
    pub num_invocations: i64,
}

impl TokenSummary {
    pub fn accumulate(&mut self, usage: &TokenUsage) {
        self.total_input_tokens += usage.input_tokens;
        self.total_output_tokens += usage.output_tokens;
        self.total_cache_read_tokens += usage.cache_read_tokens;
        self.total_cache_creation_tokens += usage.cache_creation_tokens;
        self.total_cost_usd += usage.cost_usd;
        self.total_duration_ms += usage.duration_ms;
        self.num_invocations += 1;
    }
}
