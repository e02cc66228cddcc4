//! Health check endpoint handlers, grounded on the teacher's
//! `api/handlers/health.rs`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::routes::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

/// GET /health — liveness only, no database round-trip.
pub async fn health() -> impl axum::response::IntoResponse {
    Json(HealthResponse { status: "ok", database: "unknown" })
}

/// GET /health/detailed — readiness, including a database round-trip.
pub async fn health_detailed(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ok", database: "connected" })),
        Err(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse { status: "error", database: "error" }))
        }
    }
}
