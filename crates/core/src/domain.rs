//! Request/response data model shared across the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::guardrails::GuardrailCategory;
use crate::router::Intent;
use crate::workflow::RejectionReason;

/// Opaque per-request identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single inbound question. Created at ingress, immutable, discarded
/// once the response is returned; only the cost event outlives it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub id: RequestId,
    pub raw_text: String,
    pub received_at: DateTime<Utc>,
}

impl QueryRequest {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self { id: RequestId::generate(), raw_text: raw_text.into(), received_at: Utc::now() }
    }
}

pub type ResultRow = Map<String, Value>;

/// Tabular execution result. Masking may rewrite individual values but
/// never drops or reorders rows or columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
    pub row_count: usize,
    pub truncated: bool,
    pub execution_time_ms: f64,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Name of the first column whose values are numeric, if any.
    pub fn first_numeric_column(&self) -> Option<&str> {
        self.columns.iter().map(String::as_str).find(|column| {
            self.rows
                .iter()
                .filter_map(|row| row.get(*column))
                .any(|value| value.is_number())
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

/// Declarative chart description derived from a result set. Rendering
/// is a front-end concern; the engine only decides shape and series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_column: String,
    pub y_column: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportArtifact {
    pub markdown: String,
    pub key_findings: Vec<String>,
}

/// Token usage and estimated spend for one request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CostInfo {
    pub model_name: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub estimated_cost_usd: f64,
}

impl CostInfo {
    pub fn absorb(&mut self, other: &CostInfo) {
        if self.model_name.is_empty() {
            self.model_name = other.model_name.clone();
        }
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.estimated_cost_usd += other.estimated_cost_usd;
    }
}

/// Terminal response for one request. Exactly one of these exists per
/// [`QueryRequest`], whether the workflow ended in `Done` or `Rejected`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub request_id: RequestId,
    pub intent: Intent,
    pub allowed: bool,
    pub response: String,
    pub data: Option<ResultSet>,
    pub chart: Option<ChartSpec>,
    pub report: Option<ReportArtifact>,
    pub rejection_reason: Option<RejectionReason>,
    pub guardrail_flags: Vec<GuardrailCategory>,
    pub attempts_used: u32,
    pub tools_used: Vec<String>,
    pub cost: CostInfo,
    pub execution_time_ms: f64,
}
