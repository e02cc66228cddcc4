//! Request validation helpers, grounded on the teacher's
//! `api/middleware/validation.rs`.

use crate::api::error::{ApiError, ApiResult};

pub fn validate_not_empty(value: &str, field_name: &str) -> ApiResult<()> {
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{field_name} cannot be empty")));
    }
    Ok(())
}

pub fn validate_limit(limit: i64, max: i64) -> ApiResult<()> {
    if limit <= 0 {
        return Err(ApiError::Validation("limit must be greater than 0".to_string()));
    }
    if limit > max {
        return Err(ApiError::Validation(format!("limit cannot exceed {max}")));
    }
    Ok(())
}

pub fn validate_uuid(value: &str) -> ApiResult<uuid::Uuid> {
    uuid::Uuid::parse_str(value).map_err(|_| ApiError::Validation(format!("invalid UUID: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_field() {
        assert!(validate_not_empty("", "issue_id").is_err());
    }

    #[test]
    fn accepts_nonempty_field() {
        assert!(validate_not_empty("ISSUE-1", "issue_id").is_ok());
    }

    #[test]
    fn rejects_zero_limit() {
        assert!(validate_limit(0, 100).is_err());
    }

    #[test]
    fn rejects_limit_over_max() {
        assert!(validate_limit(150, 100).is_err());
    }

    #[test]
    fn rejects_malformed_uuid() {
        assert!(validate_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn accepts_well_formed_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
    }
}
