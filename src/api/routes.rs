//! API route definitions, grounded on the teacher's `api/routes.rs`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers;
use crate::api::middleware::cors_layer;
use crate::db::connection::DatabaseConnection;
use crate::orchestrator::Orchestrator;
use crate::ws::{ws_handler, WsState};

/// Shared REST application state.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub orchestrator: Arc<Orchestrator>,
}

/// Builds the complete HTTP router: the REST surface under `AppState`,
/// plus the `/ws/events` route under its own narrower `WsState` (kept
/// separate so the WebSocket module doesn't depend on `api`).
pub fn create_router(app_state: AppState, ws_state: WsState) -> Router {
    let rest = Router::new()
        .route("/health", get(handlers::health))
        .route("/health/detailed", get(handlers::health_detailed))
        .route("/workflows", post(handlers::create_workflow).get(handlers::list_workflows))
        .route("/workflows/active", get(handlers::list_active))
        .route("/workflows/:id", get(handlers::get_workflow))
        .route("/workflows/:id/approve", post(handlers::approve_workflow))
        .route("/workflows/:id/reject", post(handlers::reject_workflow))
        .route("/workflows/:id/cancel", post(handlers::cancel_workflow))
        .route("/workflows/:id/resume", post(handlers::resume_workflow))
        .route("/workflows/:id/blocker/resolve", post(handlers::resolve_blocker))
        .route("/usage", get(handlers::get_usage))
        .with_state(app_state);

    let ws = Router::new().route("/ws/events", get(ws_handler)).with_state(ws_state);

    Router::new().merge(rest).merge(ws).layer(cors_layer())
}
