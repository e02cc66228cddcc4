//! Database-layer error taxonomy, grounded on the teacher's `db/error.rs`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("type error: {0}")]
    TypeError(String),

    #[error("migration error: {0}")]
    MigrationError(String),

    #[error("transaction error: {0}")]
    TransactionError(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("row mapping error: {0}")]
    RowMappingError(String),

    #[error("pool error: {0}")]
    PoolError(String),

    #[error("{0}")]
    Other(String),
}

impl DbError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    pub fn query_error(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".into()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Self::ConstraintViolation(db_err.to_string())
            }
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                Self::ConstraintViolation(db_err.to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => Self::PoolError(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::RowMappingError(err.to_string())
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => Self::ConnectionError(err.to_string()),
            other => Self::QueryError(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::MigrationError(err.to_string())
    }
}
