//! API response helpers, grounded on the teacher's `api/response.rs`,
//! adapted to this service's cursor-based pagination (spec.md §6.1) instead
//! of the teacher's page/per_page scheme.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(SuccessResponse::new(data)))
}

pub fn created<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::CREATED, Json(SuccessResponse::new(data)))
}

/// A page of items plus the opaque cursor to request the next one.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub next_cursor: Option<String>,
}

pub fn paginated<T: Serialize>(data: Vec<T>, next_cursor: Option<String>) -> impl IntoResponse {
    (StatusCode::OK, Json(PaginatedResponse { data, next_cursor }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestData {
        id: u32,
    }

    #[test]
    fn success_response_sets_success_flag() {
        let resp = SuccessResponse::new(TestData { id: 1 });
        assert!(resp.success);
    }

    #[test]
    fn paginated_response_carries_next_cursor() {
        let resp = PaginatedResponse { data: vec![TestData { id: 1 }], next_cursor: Some("abc".into()) };
        assert_eq!(resp.next_cursor.as_deref(), Some("abc"));
    }
}
