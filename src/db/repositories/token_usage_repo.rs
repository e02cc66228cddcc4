//! Token usage persistence and reporting aggregates, grounded on
//! `original_source/amelia/server/database/repository.py`'s usage section.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::db::connection::DatabasePool;
use crate::db::error::DbError;
use crate::db::models::TokenUsageRow;
use crate::domain::token_usage::{TokenSummary, TokenUsage};

pub struct TokenUsageRepository;

/// One day's aggregate cost, workflow count, and per-model cost breakdown.
pub struct UsageTrendPoint {
    pub date: NaiveDate,
    pub cost_usd: f64,
    pub workflows: i64,
    pub by_model: HashMap<String, f64>,
}

/// Aggregate cost/token/success metrics for a date range, plus the
/// immediately preceding period of equal length for comparison.
pub struct UsageSummary {
    pub total_cost_usd: f64,
    pub total_workflows: i64,
    pub total_tokens: i64,
    pub total_duration_ms: i64,
    pub previous_period_cost_usd: f64,
    pub successful_workflows: i64,
    pub success_rate: f64,
}

/// Per-model rollup with a dense day-by-day cost trend (one entry per
/// calendar day in range, zero-filled — not sparse) for sparkline rendering.
pub struct ModelUsage {
    pub model: String,
    pub workflows: i64,
    pub tokens: i64,
    pub cost_usd: f64,
    pub trend: Vec<f64>,
    pub successful_workflows: i64,
    pub success_rate: f64,
}

impl TokenUsageRepository {
    pub async fn save_token_usage(pool: &DatabasePool, usage: &TokenUsage) -> Result<(), DbError> {
        let row = TokenUsageRow::from_domain(usage);
        sqlx::query(
            "INSERT INTO token_usage (
                id, workflow_id, agent, model, input_tokens, output_tokens,
                cache_read_tokens, cache_creation_tokens, cost_usd, duration_ms,
                num_turns, timestamp
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.workflow_id)
        .bind(&row.agent)
        .bind(&row.model)
        .bind(row.input_tokens)
        .bind(row.output_tokens)
        .bind(row.cache_read_tokens)
        .bind(row.cache_creation_tokens)
        .bind(row.cost_usd)
        .bind(row.duration_ms)
        .bind(row.num_turns)
        .bind(&row.timestamp)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get_token_usage(pool: &DatabasePool, workflow_id: &str) -> Result<Vec<TokenUsage>, DbError> {
        let rows = sqlx::query_as::<_, TokenUsageRow>(
            "SELECT * FROM token_usage WHERE workflow_id = ? ORDER BY timestamp ASC",
        )
        .bind(workflow_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(TokenUsageRow::into_domain).collect()
    }

    pub async fn get_token_summary(
        pool: &DatabasePool,
        workflow_id: &str,
    ) -> Result<Option<TokenSummary>, DbError> {
        let usages = Self::get_token_usage(pool, workflow_id).await?;
        if usages.is_empty() {
            return Ok(None);
        }
        let mut summary = TokenSummary::default();
        usages.iter().for_each(|u| summary.accumulate(u));
        Ok(Some(summary))
    }

    /// Batches summaries for many workflows in a single query to avoid N+1
    /// lookups when listing workflows with usage totals attached. Every
    /// requested id is present in the result, `None` if it has no usage.
    pub async fn get_token_summaries_batch(
        pool: &DatabasePool,
        workflow_ids: &[String],
    ) -> Result<HashMap<String, Option<TokenSummary>>, DbError> {
        if workflow_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = std::iter::repeat("?").take(workflow_ids.len()).collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT * FROM token_usage WHERE workflow_id IN ({placeholders}) ORDER BY timestamp ASC"
        );
        let mut query = sqlx::query_as::<_, TokenUsageRow>(&sql);
        for id in workflow_ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(pool).await?;

        let mut by_workflow: HashMap<String, Vec<TokenUsage>> =
            workflow_ids.iter().map(|id| (id.clone(), Vec::new())).collect();
        for row in rows {
            let usage = row.into_domain()?;
            by_workflow.entry(usage.workflow_id.to_string()).or_default().push(usage);
        }

        Ok(by_workflow
            .into_iter()
            .map(|(id, usages)| {
                if usages.is_empty() {
                    (id, None)
                } else {
                    let mut summary = TokenSummary::default();
                    usages.iter().for_each(|u| summary.accumulate(u));
                    (id, Some(summary))
                }
            })
            .collect())
    }

    pub async fn get_usage_summary(
        pool: &DatabasePool,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<UsageSummary, DbError> {
        let period_days = (end_date - start_date).num_days() + 1;
        let prev_end = start_date - chrono::Duration::days(1);
        let prev_start = prev_end - chrono::Duration::days(period_days - 1);

        let row: (f64, i64, i64, i64) = sqlx::query_as(
            "SELECT
                COALESCE(SUM(cost_usd), 0),
                COUNT(DISTINCT workflow_id),
                COALESCE(SUM(input_tokens + output_tokens), 0),
                COALESCE(SUM(duration_ms), 0)
             FROM token_usage
             WHERE date(timestamp) >= ? AND date(timestamp) <= ?",
        )
        .bind(start_date.to_string())
        .bind(end_date.to_string())
        .fetch_one(pool)
        .await?;

        let prev_row: (f64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(cost_usd), 0) FROM token_usage
             WHERE date(timestamp) >= ? AND date(timestamp) <= ?",
        )
        .bind(prev_start.to_string())
        .bind(prev_end.to_string())
        .fetch_one(pool)
        .await?;

        let success_row: (Option<i64>,) = sqlx::query_as(
            "SELECT SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END)
             FROM workflows
             WHERE date(completed_at) >= ? AND date(completed_at) <= ?
               AND status IN ('completed', 'failed', 'cancelled')",
        )
        .bind(start_date.to_string())
        .bind(end_date.to_string())
        .fetch_one(pool)
        .await?;

        let total_workflows = row.1;
        let successful_workflows = success_row.0.unwrap_or(0);
        let success_rate = if total_workflows > 0 {
            successful_workflows as f64 / total_workflows as f64
        } else {
            0.0
        };

        Ok(UsageSummary {
            total_cost_usd: row.0,
            total_workflows,
            total_tokens: row.2,
            total_duration_ms: row.3,
            previous_period_cost_usd: prev_row.0,
            successful_workflows,
            success_rate,
        })
    }

    pub async fn get_usage_trend(
        pool: &DatabasePool,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<UsageTrendPoint>, DbError> {
        let daily: Vec<(String, f64, i64)> = sqlx::query_as(
            "SELECT date(timestamp), SUM(cost_usd), COUNT(DISTINCT workflow_id)
             FROM token_usage
             WHERE date(timestamp) >= ? AND date(timestamp) <= ?
             GROUP BY date(timestamp) ORDER BY date(timestamp)",
        )
        .bind(start_date.to_string())
        .bind(end_date.to_string())
        .fetch_all(pool)
        .await?;

        let model_rows: Vec<(String, String, f64)> = sqlx::query_as(
            "SELECT date(timestamp), model, SUM(cost_usd)
             FROM token_usage
             WHERE date(timestamp) >= ? AND date(timestamp) <= ?
             GROUP BY date(timestamp), model ORDER BY date(timestamp), SUM(cost_usd) DESC",
        )
        .bind(start_date.to_string())
        .bind(end_date.to_string())
        .fetch_all(pool)
        .await?;

        let mut by_model_lookup: HashMap<String, HashMap<String, f64>> = HashMap::new();
        for (date, model, cost) in model_rows {
            by_model_lookup.entry(date).or_default().insert(model, cost);
        }

        daily
            .into_iter()
            .map(|(date_str, cost_usd, workflows)| {
                let date = date_str
                    .parse::<NaiveDate>()
                    .map_err(|e| DbError::type_error(e.to_string()))?;
                Ok(UsageTrendPoint {
                    date,
                    cost_usd,
                    workflows,
                    by_model: by_model_lookup.remove(&date_str).unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Unlike [`get_usage_trend`], each model's `trend` is densely zero-filled
    /// for every calendar day in range, not just days with activity — the
    /// source's sparklines assume a fixed-length array per model.
    pub async fn get_usage_by_model(
        pool: &DatabasePool,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ModelUsage>, DbError> {
        let rows: Vec<(String, i64, i64, f64)> = sqlx::query_as(
            "SELECT model, COUNT(DISTINCT workflow_id), SUM(input_tokens + output_tokens), SUM(cost_usd)
             FROM token_usage
             WHERE date(timestamp) >= ? AND date(timestamp) <= ?
             GROUP BY model ORDER BY SUM(cost_usd) DESC",
        )
        .bind(start_date.to_string())
        .bind(end_date.to_string())
        .fetch_all(pool)
        .await?;

        let trend_rows: Vec<(String, String, f64)> = sqlx::query_as(
            "SELECT model, date(timestamp), SUM(cost_usd)
             FROM token_usage
             WHERE date(timestamp) >= ? AND date(timestamp) <= ?
             GROUP BY model, date(timestamp) ORDER BY model, date(timestamp)",
        )
        .bind(start_date.to_string())
        .bind(end_date.to_string())
        .fetch_all(pool)
        .await?;

        let mut trend_lookup: HashMap<String, HashMap<NaiveDate, f64>> = HashMap::new();
        for (model, date_str, cost) in trend_rows {
            let date = date_str.parse::<NaiveDate>().map_err(|e| DbError::type_error(e.to_string()))?;
            trend_lookup.entry(model).or_default().insert(date, cost);
        }

        let num_days = (end_date - start_date).num_days() + 1;
        let date_range: Vec<NaiveDate> =
            (0..num_days).map(|i| start_date + chrono::Duration::days(i)).collect();

        let success_rows: Vec<(String, i64, i64)> = sqlx::query_as(
            "SELECT t.model, COUNT(DISTINCT t.workflow_id),
                    COUNT(DISTINCT CASE WHEN w.status = 'completed' THEN t.workflow_id END)
             FROM token_usage t JOIN workflows w ON t.workflow_id = w.id
             WHERE date(t.timestamp) >= ? AND date(t.timestamp) <= ?
             GROUP BY t.model",
        )
        .bind(start_date.to_string())
        .bind(end_date.to_string())
        .fetch_all(pool)
        .await?;

        let success_lookup: HashMap<String, (i64, i64)> =
            success_rows.into_iter().map(|(model, total, successful)| (model, (total, successful))).collect();

        Ok(rows
            .into_iter()
            .map(|(model, workflows, tokens, cost_usd)| {
                let trend = date_range
                    .iter()
                    .map(|d| *trend_lookup.get(&model).and_then(|m| m.get(d)).unwrap_or(&0.0))
                    .collect();
                let (total, successful) = success_lookup.get(&model).copied().unwrap_or((0, 0));
                let success_rate = if total > 0 { (successful as f64 / total as f64 * 10000.0).round() / 10000.0 } else { 0.0 };
                ModelUsage {
                    model,
                    workflows,
                    tokens,
                    cost_usd,
                    trend,
                    successful_workflows: successful,
                    success_rate,
                }
            })
            .collect())
    }
}
