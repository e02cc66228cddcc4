//! On-disk representation of [`TokenUsage`](crate::domain::TokenUsage).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::error::DbError;
use crate::domain::token_usage::TokenUsage;

#[derive(Debug, Clone, FromRow)]
pub struct TokenUsageRow {
    pub id: String,
    pub workflow_id: String,
    pub agent: String,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_read_tokens: i64,
    pub cache_creation_tokens: i64,
    pub cost_usd: f64,
    pub duration_ms: i64,
    pub num_turns: i64,
    pub timestamp: String,
}

impl TokenUsageRow {
    pub fn into_domain(self) -> Result<TokenUsage, DbError> {
        Ok(TokenUsage {
            id: Uuid::parse_str(&self.id).map_err(|e| DbError::type_error(e.to_string()))?,
            workflow_id: Uuid::parse_str(&self.workflow_id)
                .map_err(|e| DbError::type_error(e.to_string()))?,
            agent: self.agent,
            model: self.model,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            cache_read_tokens: self.cache_read_tokens,
            cache_creation_tokens: self.cache_creation_tokens,
            cost_usd: self.cost_usd,
            duration_ms: self.duration_ms,
            num_turns: self.num_turns,
            timestamp: DateTime::parse_from_rfc3339(&self.timestamp)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DbError::type_error(e.to_string()))?,
        })
    }

    pub fn from_domain(u: &TokenUsage) -> Self {
        Self {
            id: u.id.to_string(),
            workflow_id: u.workflow_id.to_string(),
            agent: u.agent.clone(),
            model: u.model.clone(),
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
            cache_read_tokens: u.cache_read_tokens,
            cache_creation_tokens: u.cache_creation_tokens,
            cost_usd: u.cost_usd,
            duration_ms: u.duration_ms,
            num_turns: u.num_turns,
            timestamp: u.timestamp.to_rfc3339(),
        }
    }
}
