//! Event log persistence (spec.md §4.1, §4.4.6, §6.3).

use crate::db::connection::DatabasePool;
use crate::db::error::DbError;
use crate::db::models::EventRow;
use crate::domain::event::Event;

pub struct EventRepository;

impl EventRepository {
    pub async fn save_event(pool: &DatabasePool, event: &Event) -> Result<(), DbError> {
        let row = EventRow::from_domain(event)?;
        sqlx::query(
            "INSERT INTO workflow_log (
                id, workflow_id, sequence, timestamp, agent, event_type, level,
                message, data, is_error, correlation_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.workflow_id)
        .bind(row.sequence)
        .bind(&row.timestamp)
        .bind(&row.agent)
        .bind(&row.event_type)
        .bind(&row.level)
        .bind(&row.message)
        .bind(&row.data)
        .bind(row.is_error)
        .bind(&row.correlation_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// The next sequence number to assign is `get_max_event_sequence + 1`
    /// (spec.md §4.4.6); `None` if the workflow has no persisted events yet.
    pub async fn get_max_event_sequence(
        pool: &DatabasePool,
        workflow_id: &str,
    ) -> Result<Option<u64>, DbError> {
        let row: (Option<i64>,) =
            sqlx::query_as("SELECT MAX(sequence) FROM workflow_log WHERE workflow_id = ?")
                .bind(workflow_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0.map(|n| n as u64))
    }

    pub async fn event_exists(pool: &DatabasePool, id: &str) -> Result<bool, DbError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM workflow_log WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(row.0 > 0)
    }

    pub async fn get_events_after(
        pool: &DatabasePool,
        workflow_id: &str,
        after_sequence: u64,
    ) -> Result<Vec<Event>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT * FROM workflow_log WHERE workflow_id = ? AND sequence > ?
             ORDER BY sequence ASC",
        )
        .bind(workflow_id)
        .bind(after_sequence as i64)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(EventRow::into_domain).collect()
    }

    pub async fn get_recent_events(
        pool: &DatabasePool,
        workflow_id: &str,
        limit: i64,
    ) -> Result<Vec<Event>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT * FROM workflow_log WHERE workflow_id = ?
             ORDER BY sequence DESC LIMIT ?",
        )
        .bind(workflow_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        let mut events = rows
            .into_iter()
            .map(EventRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        events.reverse();
        Ok(events)
    }
}
