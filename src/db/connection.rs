//! Database connection pooling, health checks, and pool statistics.
//! Grounded directly on the teacher's `db/connection.rs`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::error::DbError;

pub type DatabasePool = SqlitePool;

#[derive(Debug, Clone)]
pub struct PoolStatistics {
    pub idle_connections: u32,
    pub active_connections: u32,
    pub max_connections: u32,
    pub collected_at: u64,
}

/// Cheaply cloneable handle to the pool.
#[derive(Clone)]
pub struct DatabaseConnection {
    pool: Arc<DatabasePool>,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self, DbError> {
        Self::with_max_connections(database_url, 5).await
    }

    pub async fn with_max_connections(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").fetch_one(self.pool.as_ref()).await?;
        Ok(())
    }

    pub fn get_pool_statistics(&self) -> PoolStatistics {
        let pool_ref = self.pool.as_ref();
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();

        let idle = pool_ref.num_idle() as u32;
        let total = pool_ref.size();

        PoolStatistics {
            idle_connections: idle,
            active_connections: total.saturating_sub(idle),
            max_connections: total,
            collected_at: now,
        }
    }

    pub fn is_pool_healthy(&self) -> bool {
        let stats = self.get_pool_statistics();
        stats.active_connections < stats.max_connections
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    pub async fn wait_for_connection(&self, timeout_secs: u64) -> Result<(), DbError> {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_secs(timeout_secs);

        loop {
            if self.get_pool_statistics().idle_connections > 0 {
                return Ok(());
            }
            if start.elapsed() > timeout {
                return Err(DbError::ConnectionError(format!(
                    "timeout waiting for connection after {timeout_secs} seconds"
                )));
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_check_succeeds_on_fresh_in_memory_db() {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        assert!(conn.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn pool_statistics_reflect_configured_max() {
        let conn = DatabaseConnection::with_max_connections("sqlite::memory:", 3)
            .await
            .unwrap();
        let stats = conn.get_pool_statistics();
        assert!(stats.idle_connections > 0);
        assert!(stats.max_connections <= 3);
    }
}
