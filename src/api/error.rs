//! API error types and HTTP response conversion (spec.md §7), grounded on
//! the teacher's `api/error.rs`. Wraps the domain [`OrchestratorError`]
//! taxonomy rather than duplicating it, so the machine-readable `code()`
//! stays defined in one place.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::OrchestratorError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
    pub details: Option<serde_json::Value>,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self { error: error.into(), code: code.into(), details }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] OrchestratorError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("malformed request body: {0}")]
    Json(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Domain(err) => status_for(err),
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Json(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(err) => err.code(),
            Self::Validation(_) => "ValidationError",
            Self::Json(_) => "ValidationError",
        }
    }
}

fn status_for(err: &OrchestratorError) -> StatusCode {
    match err {
        OrchestratorError::InvalidWorktree(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::WorktreeConflict(_) => StatusCode::CONFLICT,
        OrchestratorError::ConcurrencyLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
        OrchestratorError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OrchestratorError::InvalidTransition { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
        OrchestratorError::PolicyDenied(_) => StatusCode::FORBIDDEN,
        OrchestratorError::ValidationError(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::Repository(_) | OrchestratorError::ExecutionFailed(_) | OrchestratorError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.to_string(), self.code(), None);

        tracing::error!(code = self.code(), "api error: {}", self);

        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::Domain(OrchestratorError::ConcurrencyLimit { .. })) {
            response.headers_mut().insert("Retry-After", HeaderValue::from_static("30"));
        }
        response
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Json(err.to_string())
    }
}
