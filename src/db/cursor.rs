//! Opaque pagination cursor: base64 of `"{started_at}|{id}"` (spec.md §6.1).

use base64::Engine;
use chrono::{DateTime, Utc};

use super::error::DbError;

const ENGINE: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

pub struct Cursor {
    pub started_at: DateTime<Utc>,
    pub id: String,
}

impl Cursor {
    pub fn encode(started_at: DateTime<Utc>, id: &str) -> String {
        let raw = format!("{}|{}", started_at.to_rfc3339(), id);
        ENGINE.encode(raw)
    }

    pub fn decode(token: &str) -> Result<Self, DbError> {
        let raw = ENGINE
            .decode(token)
            .map_err(|e| DbError::QueryError(format!("invalid cursor: {e}")))?;
        let raw = String::from_utf8(raw).map_err(|e| DbError::QueryError(format!("invalid cursor: {e}")))?;

        let (ts, id) = raw
            .split_once('|')
            .ok_or_else(|| DbError::QueryError("malformed cursor".into()))?;

        let started_at = DateTime::parse_from_rfc3339(ts)
            .map_err(|e| DbError::QueryError(format!("invalid cursor timestamp: {e}")))?
            .with_timezone(&Utc);

        Ok(Self { started_at, id: id.to_string() })
    }
}
