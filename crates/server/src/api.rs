//! HTTP surface: the query endpoint plus guardrail and cost
//! introspection.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use tabula_agent::AgentRuntime;
use tabula_core::config::GuardrailsConfig;
use tabula_core::cost::CostSummary;
use tabula_core::domain::{QueryRequest, WorkflowResponse};
use tabula_core::errors::{ApplicationError, InterfaceError};
use tabula_core::guardrails::{
    GuardrailCategory, GuardrailDirection, GuardrailReport, GuardrailService, GuardrailSeverity,
    InputValidator,
};
use tabula_core::sql::{QueryValidator, ValidationOutcome};
use tabula_db::DbPool;

pub struct ApiState {
    runtime: Arc<AgentRuntime>,
    service: Arc<GuardrailService>,
    probe: InputValidator,
    sql_probe: QueryValidator,
    db_pool: DbPool,
    request_timeout: Duration,
}

impl ApiState {
    pub fn new(
        runtime: Arc<AgentRuntime>,
        service: Arc<GuardrailService>,
        guardrails: &GuardrailsConfig,
        db_pool: DbPool,
        request_timeout: Duration,
    ) -> Self {
        Self {
            runtime,
            probe: InputValidator::new(
                guardrails.min_query_chars,
                guardrails.max_query_chars,
                Arc::clone(&service),
            ),
            sql_probe: QueryValidator::new(&guardrails.allowed_tables),
            service,
            db_pool,
            request_timeout,
        }
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/query", post(query))
        .route("/guardrails/test", post(guardrails_test))
        .route("/guardrails/stats", get(guardrails_stats))
        .route("/cost/summary", get(cost_summary))
        .with_state(state)
}

#[derive(Deserialize)]
struct QueryBody {
    question: String,
}

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    correlation_id: String,
}

fn interface_reply(error: InterfaceError) -> (StatusCode, Json<ApiErrorBody>) {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let correlation_id = match &error {
        InterfaceError::BadRequest { correlation_id, .. }
        | InterfaceError::ServiceUnavailable { correlation_id, .. }
        | InterfaceError::Internal { correlation_id, .. } => correlation_id.clone(),
    };
    (status, Json(ApiErrorBody { error: error.user_message().to_string(), correlation_id }))
}

/// Runs one question through the full workflow. Rejections are normal
/// responses with `allowed == false`; only a deadline overrun maps to
/// an HTTP error.
async fn query(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<QueryBody>,
) -> Result<Json<WorkflowResponse>, (StatusCode, Json<ApiErrorBody>)> {
    let request = QueryRequest::new(body.question);
    let request_id = request.id.clone();

    match timeout(state.request_timeout, state.runtime.handle(request)).await {
        Ok(response) => Ok(Json(response)),
        Err(_) => {
            tracing::warn!(
                event_name = "api.query.deadline_exceeded",
                request_id = %request_id,
                timeout_secs = state.request_timeout.as_secs(),
                "query request exceeded the server deadline"
            );
            let error = ApplicationError::Upstream(
                "query workflow exceeded the server deadline".to_string(),
            )
            .into_interface(request_id.0);
            Err(interface_reply(error))
        }
    }
}

#[derive(Deserialize)]
struct ProbeBody {
    text: String,
}

#[derive(Serialize)]
struct ProbeResponse {
    input: GuardrailReport,
    sql: ValidationOutcome,
}

/// Dry-run endpoint: evaluates a text against the input battery and
/// the SQL validator without generating or executing anything. Probe
/// verdicts are recorded in the shared counters like any other.
async fn guardrails_test(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<ProbeBody>,
) -> Json<ProbeResponse> {
    let input = state.probe.evaluate(&body.text);
    let sql = state.sql_probe.validate(&body.text);
    Json(ProbeResponse { input, sql })
}

#[derive(Serialize)]
struct CounterRow {
    direction: GuardrailDirection,
    category: GuardrailCategory,
    severity: GuardrailSeverity,
    count: u64,
}

#[derive(Serialize)]
struct StatsResponse {
    total: u64,
    counters: Vec<CounterRow>,
}

async fn guardrails_stats(State(state): State<Arc<ApiState>>) -> Json<StatsResponse> {
    let snapshot = state.service.snapshot();
    let counters = snapshot
        .into_iter()
        .map(|(key, count)| CounterRow {
            direction: key.direction,
            category: key.category,
            severity: key.severity,
            count,
        })
        .collect::<Vec<_>>();
    let total = counters.iter().map(|row| row.count).sum();
    Json(StatsResponse { total, counters })
}

#[derive(Deserialize)]
struct SummaryParams {
    days: Option<u32>,
}

async fn cost_summary(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<CostSummary>, (StatusCode, Json<ApiErrorBody>)> {
    let days = params.days.unwrap_or(7).max(1);
    match tabula_db::cost::summary(&state.db_pool, days).await {
        Ok(summary) => Ok(Json(summary)),
        Err(error) => {
            tracing::error!(
                event_name = "api.cost_summary.failed",
                error = %error,
                "cost summary query failed"
            );
            let error =
                ApplicationError::Persistence(error.to_string()).into_interface("cost_summary");
            Err(interface_reply(error))
        }
    }
}
