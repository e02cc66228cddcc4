//! On-disk representation of [`Event`](crate::domain::Event).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::error::DbError;
use crate::domain::event::{Event, EventLevel, EventType};

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: String,
    pub workflow_id: String,
    pub sequence: i64,
    pub timestamp: String,
    pub agent: String,
    pub event_type: String,
    pub level: String,
    pub message: String,
    pub data: Option<String>,
    pub is_error: i64,
    pub correlation_id: Option<String>,
}

fn parse_level(s: &str) -> Result<EventLevel, DbError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DbError::type_error(format!("invalid level {s:?}: {e}")))
}

fn parse_event_type(s: &str) -> Result<EventType, DbError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DbError::type_error(format!("invalid event_type {s:?}: {e}")))
}

impl EventRow {
    pub fn into_domain(self) -> Result<Event, DbError> {
        Ok(Event {
            id: Uuid::parse_str(&self.id).map_err(|e| DbError::type_error(e.to_string()))?,
            workflow_id: Uuid::parse_str(&self.workflow_id)
                .map_err(|e| DbError::type_error(e.to_string()))?,
            sequence: self.sequence as u64,
            timestamp: DateTime::parse_from_rfc3339(&self.timestamp)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DbError::type_error(e.to_string()))?,
            agent: self.agent,
            event_type: parse_event_type(&self.event_type)?,
            level: parse_level(&self.level)?,
            message: self.message,
            data: self
                .data
                .as_deref()
                .map(|raw| serde_json::from_str(raw).map_err(|e| DbError::type_error(e.to_string())))
                .transpose()?,
            is_error: self.is_error != 0,
            correlation_id: self
                .correlation_id
                .as_deref()
                .map(Uuid::parse_str)
                .transpose()
                .map_err(|e| DbError::type_error(e.to_string()))?,
        })
    }

    pub fn from_domain(e: &Event) -> Result<Self, DbError> {
        let event_type = serde_json::to_value(&e.event_type)
            .map_err(|err| DbError::type_error(err.to_string()))?;
        let level = serde_json::to_value(&e.level).map_err(|err| DbError::type_error(err.to_string()))?;

        Ok(Self {
            id: e.id.to_string(),
            workflow_id: e.workflow_id.to_string(),
            sequence: e.sequence as i64,
            timestamp: e.timestamp.to_rfc3339(),
            agent: e.agent.clone(),
            event_type: event_type.as_str().unwrap_or_default().to_string(),
            level: level.as_str().unwrap_or_default().to_string(),
            message: e.message.clone(),
            data: e.data.as_ref().map(|v| v.to_string()),
            is_error: e.is_error as i64,
            correlation_id: e.correlation_id.map(|id| id.to_string()),
        })
    }
}
