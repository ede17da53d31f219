//! Mutable per-request scratchpad carried by the driving loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{CostInfo, QueryRequest, ResultSet};
use crate::guardrails::GuardrailCategory;
use crate::router::Intent;
use crate::sql::ValidationReason;

/// A generated query awaiting validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCandidate {
    pub text: String,
    pub source_intent: Intent,
}

/// One tool invocation made on behalf of a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub arguments: Value,
    pub attempt: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum AttemptOutcome {
    Denied { reason: ValidationReason },
    ExecutionFailed { error: String },
    OutputBlocked,
    Succeeded,
    Implausible,
}

/// What happened on one pass through generate/validate/execute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub index: u32,
    pub candidate_sql: String,
    pub outcome: AttemptOutcome,
}

/// Accumulated context for one request as the loop drives it forward.
/// Everything here is derived from events the loop already observed;
/// nothing is shared across requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentState {
    pub request: QueryRequest,
    pub intent: Intent,
    pub attempts: Vec<AttemptRecord>,
    pub guardrail_flags: Vec<GuardrailCategory>,
    pub tools_used: Vec<ToolCall>,
    pub result: Option<ResultSet>,
    pub cost: CostInfo,
    pub final_response: Option<String>,
}

impl AgentState {
    pub fn new(request: QueryRequest) -> Self {
        Self {
            request,
            intent: Intent::General,
            attempts: Vec::new(),
            guardrail_flags: Vec::new(),
            tools_used: Vec::new(),
            result: None,
            cost: CostInfo::default(),
            final_response: None,
        }
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts.len() as u32
    }

    pub fn record_attempt(&mut self, candidate_sql: impl Into<String>, outcome: AttemptOutcome) {
        let index = self.attempts_used() + 1;
        self.attempts.push(AttemptRecord {
            index,
            candidate_sql: candidate_sql.into(),
            outcome,
        });
    }

    pub fn record_tool(&mut self, tool: impl Into<String>, arguments: Value) {
        let attempt = self.attempts_used();
        self.tools_used.push(ToolCall { tool: tool.into(), arguments, attempt });
    }

    pub fn flag(&mut self, category: GuardrailCategory) {
        if !self.guardrail_flags.contains(&category) {
            self.guardrail_flags.push(category);
        }
    }

    pub fn last_denial(&self) -> Option<&AttemptRecord> {
        self.attempts
            .iter()
            .rev()
            .find(|attempt| matches!(attempt.outcome, AttemptOutcome::Denied { .. }))
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for call in &self.tools_used {
            if !names.contains(&call.tool) {
                names.push(call.tool.clone());
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AgentState, AttemptOutcome};
    use crate::domain::QueryRequest;
    use crate::guardrails::GuardrailCategory;
    use crate::sql::ValidationReason;

    #[test]
    fn attempt_records_are_numbered_from_one() {
        let mut state = AgentState::new(QueryRequest::new("top products"));
        state.record_attempt(
            "SELECT * FROM admin_users",
            AttemptOutcome::Denied { reason: ValidationReason::TableNotAllowed },
        );
        state.record_attempt("SELECT name FROM products", AttemptOutcome::Succeeded);

        assert_eq!(state.attempts_used(), 2);
        assert_eq!(state.attempts[0].index, 1);
        assert_eq!(state.attempts[1].index, 2);
        assert!(state.last_denial().is_some());
    }

    #[test]
    fn guardrail_flags_are_deduplicated() {
        let mut state = AgentState::new(QueryRequest::new("orders for jane@example.com"));
        state.flag(GuardrailCategory::Pii);
        state.flag(GuardrailCategory::Pii);

        assert_eq!(state.guardrail_flags, vec![GuardrailCategory::Pii]);
    }

    #[test]
    fn tool_names_preserve_first_use_order() {
        let mut state = AgentState::new(QueryRequest::new("chart revenue"));
        state.record_tool("query_execute", json!({"sql": "SELECT 1"}));
        state.record_tool("chart_generate", json!({"kind": "bar"}));
        state.record_tool("query_execute", json!({"sql": "SELECT 2"}));

        assert_eq!(state.tool_names(), vec!["query_execute", "chart_generate"]);
    }
}
