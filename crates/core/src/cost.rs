//! Cost accounting: per-request usage events and the sink seam.
//!
//! Recording is write-only from the workflow's perspective. Nothing in
//! the request path ever reads cost data back; summaries are served
//! from storage by a separate surface.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RequestId;
use crate::guardrails::GuardrailCategory;

/// Published exactly once per request when it reaches a terminal state,
/// whether it succeeded or not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostEvent {
    pub request_id: RequestId,
    pub model_name: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub estimated_cost_usd: f64,
    pub latency_ms: f64,
    pub tools_used: Vec<String>,
    pub guardrail_flags: Vec<GuardrailCategory>,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum CostError {
    #[error("cost storage failed: {0}")]
    Storage(String),
}

/// Destination for cost events. Sinks must tolerate concurrent emits;
/// a failing sink must not fail the request it accounts for.
#[async_trait]
pub trait CostSink: Send + Sync {
    async fn emit(&self, event: CostEvent) -> Result<(), CostError>;
}

/// In-memory sink for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct InMemoryCostSink {
    events: Mutex<Vec<CostEvent>>,
}

impl InMemoryCostSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CostEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl CostSink for InMemoryCostSink {
    async fn emit(&self, event: CostEvent) -> Result<(), CostError> {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event);
        Ok(())
    }
}

/// USD per 1K tokens, `(prompt, completion)`. Unknown models, local
/// models included, are accounted at zero.
const MODEL_RATES: &[(&str, f64, f64)] = &[
    ("gpt-4o", 0.0025, 0.01),
    ("gpt-4o-mini", 0.000_15, 0.000_6),
    ("gpt-4-turbo", 0.01, 0.03),
    ("claude-3-5-sonnet", 0.003, 0.015),
    ("claude-3-5-haiku", 0.000_8, 0.004),
];

pub fn estimate_cost_usd(model_name: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
    let lowered = model_name.to_ascii_lowercase();
    MODEL_RATES
        .iter()
        .find(|(prefix, _, _)| lowered.starts_with(prefix))
        .map(|(_, prompt_rate, completion_rate)| {
            f64::from(prompt_tokens) / 1000.0 * prompt_rate
                + f64::from(completion_tokens) / 1000.0 * completion_rate
        })
        .unwrap_or(0.0)
}

/// Aggregate view over stored cost events, served by the stats surface.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub avg_latency_ms: f64,
    pub by_model: Vec<ModelUsage>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub model_name: String,
    pub requests: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
}
