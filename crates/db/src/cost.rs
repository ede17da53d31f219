//! Durable cost event storage and the summary queries over it.

use async_trait::async_trait;
use sqlx::Row;

use tabula_core::cost::{CostError, CostEvent, CostSink, CostSummary, ModelUsage};

use crate::DbPool;

/// Appends cost events to the `cost_events` table. Append-only; the
/// request path never reads this table back.
pub struct SqliteCostRecorder {
    pool: DbPool,
}

impl SqliteCostRecorder {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CostSink for SqliteCostRecorder {
    async fn emit(&self, event: CostEvent) -> Result<(), CostError> {
        let tools_used =
            serde_json::to_string(&event.tools_used).unwrap_or_else(|_| "[]".to_string());
        let guardrail_flags =
            serde_json::to_string(&event.guardrail_flags).unwrap_or_else(|_| "[]".to_string());

        sqlx::query(
            "INSERT INTO cost_events (
                 request_id, model_name, prompt_tokens, completion_tokens, total_tokens,
                 estimated_cost_usd, latency_ms, tools_used, guardrail_flags, success, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(event.request_id.0)
        .bind(event.model_name)
        .bind(i64::from(event.prompt_tokens))
        .bind(i64::from(event.completion_tokens))
        .bind(i64::from(event.total_tokens))
        .bind(event.estimated_cost_usd)
        .bind(event.latency_ms)
        .bind(tools_used)
        .bind(guardrail_flags)
        .bind(event.success)
        // Matches the rendering of datetime('now') so the summary
        // window comparison is exact at time-of-day granularity.
        .bind(event.created_at.format("%Y-%m-%d %H:%M:%S").to_string())
        .execute(&self.pool)
        .await
        .map_err(|error| CostError::Storage(error.to_string()))?;

        Ok(())
    }
}

/// Aggregates stored cost events over the trailing `days` window.
pub async fn summary(pool: &DbPool, days: u32) -> Result<CostSummary, sqlx::Error> {
    let window = format!("-{days} days");

    let totals = sqlx::query(
        "SELECT COUNT(*) AS total_requests,
                IFNULL(SUM(success), 0) AS successful_requests,
                IFNULL(SUM(total_tokens), 0) AS total_tokens,
                IFNULL(SUM(estimated_cost_usd), 0.0) AS total_cost_usd,
                IFNULL(AVG(latency_ms), 0.0) AS avg_latency_ms
         FROM cost_events
         WHERE created_at >= datetime('now', ?1)",
    )
    .bind(&window)
    .fetch_one(pool)
    .await?;

    let by_model = sqlx::query(
        "SELECT model_name,
                COUNT(*) AS requests,
                IFNULL(SUM(total_tokens), 0) AS total_tokens,
                IFNULL(SUM(estimated_cost_usd), 0.0) AS total_cost_usd
         FROM cost_events
         WHERE created_at >= datetime('now', ?1)
         GROUP BY model_name
         ORDER BY total_cost_usd DESC, model_name ASC",
    )
    .bind(&window)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| ModelUsage {
        model_name: row.get::<String, _>("model_name"),
        requests: row.get::<i64, _>("requests") as u64,
        total_tokens: row.get::<i64, _>("total_tokens") as u64,
        total_cost_usd: row.get::<f64, _>("total_cost_usd"),
    })
    .collect();

    Ok(CostSummary {
        total_requests: totals.get::<i64, _>("total_requests") as u64,
        successful_requests: totals.get::<i64, _>("successful_requests") as u64,
        total_tokens: totals.get::<i64, _>("total_tokens") as u64,
        total_cost_usd: totals.get::<f64, _>("total_cost_usd"),
        avg_latency_ms: totals.get::<f64, _>("avg_latency_ms"),
        by_model,
    })
}
