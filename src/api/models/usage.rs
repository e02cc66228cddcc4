//! `GET /usage` request/response DTOs (spec.md §6.1), grounded on the
//! teacher's models shape and `db::repositories::token_usage_repo`'s
//! aggregates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::db::repositories::token_usage_repo::{ModelUsage, UsageSummary, UsageTrendPoint};

#[derive(Debug, Clone, Deserialize)]
pub struct UsageQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub preset: Option<String>,
}

impl UsageQuery {
    /// Resolves to a concrete `[start, end]` range: an explicit `start`/`end`
    /// pair takes precedence over `preset`, which defaults to `30d`.
    pub fn resolve(&self, today: NaiveDate) -> ApiResult<(NaiveDate, NaiveDate)> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ApiError::Validation("start must not be after end".to_string()));
            }
            return Ok((start, end));
        }

        let days = match self.preset.as_deref().unwrap_or("30d") {
            "7d" => 7,
            "30d" => 30,
            "90d" => 90,
            "all" => return Ok((NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(), today)),
            other => return Err(ApiError::Validation(format!("unknown preset: {other}"))),
        };
        Ok((today - chrono::Duration::days(days - 1), today))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageSummaryResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_cost_usd: f64,
    pub total_workflows: i64,
    pub total_tokens: i64,
    pub total_duration_ms: i64,
    pub previous_period_cost_usd: f64,
    pub successful_workflows: i64,
    pub success_rate: f64,
    pub trend: Vec<UsageTrendPointResponse>,
    pub by_model: Vec<ModelUsageResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageTrendPointResponse {
    pub date: NaiveDate,
    pub cost_usd: f64,
    pub workflows: i64,
    pub by_model: std::collections::HashMap<String, f64>,
}

impl From<UsageTrendPoint> for UsageTrendPointResponse {
    fn from(p: UsageTrendPoint) -> Self {
        Self { date: p.date, cost_usd: p.cost_usd, workflows: p.workflows, by_model: p.by_model }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelUsageResponse {
    pub model: String,
    pub workflows: i64,
    pub tokens: i64,
    pub cost_usd: f64,
    pub trend: Vec<f64>,
    pub successful_workflows: i64,
    pub success_rate: f64,
}

impl From<ModelUsage> for ModelUsageResponse {
    fn from(m: ModelUsage) -> Self {
        Self {
            model: m.model,
            workflows: m.workflows,
            tokens: m.tokens,
            cost_usd: m.cost_usd,
            trend: m.trend,
            successful_workflows: m.successful_workflows,
            success_rate: m.success_rate,
        }
    }
}

impl UsageSummaryResponse {
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        summary: UsageSummary,
        trend: Vec<UsageTrendPoint>,
        by_model: Vec<ModelUsage>,
    ) -> Self {
        Self {
            start,
            end,
            total_cost_usd: summary.total_cost_usd,
            total_workflows: summary.total_workflows,
            total_tokens: summary.total_tokens,
            total_duration_ms: summary.total_duration_ms,
            previous_period_cost_usd: summary.previous_period_cost_usd,
            successful_workflows: summary.successful_workflows,
            success_rate: summary.success_rate,
            trend: trend.into_iter().map(Into::into).collect(),
            by_model: by_model.into_iter().map(Into::into).collect(),
        }
    }
}
