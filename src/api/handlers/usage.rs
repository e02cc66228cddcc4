//! `GET /usage` handler (spec.md §6.1), grounded on
//! `db::repositories::token_usage_repo` and the teacher's handler shape.

use axum::extract::{Query, State};

use crate::api::error::ApiResult;
use crate::api::models::{UsageQuery, UsageSummaryResponse};
use crate::api::response;
use crate::api::routes::AppState;
use crate::db::repositories::TokenUsageRepository;
use crate::error::OrchestratorError;

pub async fn get_usage(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let today = chrono::Utc::now().date_naive();
    let (start, end) = query.resolve(today)?;

    let summary =
        TokenUsageRepository::get_usage_summary(state.db.pool(), start, end).await.map_err(OrchestratorError::from)?;
    let trend =
        TokenUsageRepository::get_usage_trend(state.db.pool(), start, end).await.map_err(OrchestratorError::from)?;
    let by_model = TokenUsageRepository::get_usage_by_model(state.db.pool(), start, end)
        .await
        .map_err(OrchestratorError::from)?;

    Ok(response::ok(UsageSummaryResponse::new(start, end, summary, trend, by_model)))
}
