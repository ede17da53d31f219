//! State and event vocabulary for the request lifecycle.

use serde::{Deserialize, Serialize};

use crate::guardrails::{GuardrailCategory, GuardrailDirection};
use crate::router::Intent;

/// Lifecycle states. `Done` and `Rejected` are terminal; everything
/// else expects exactly one more event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Start,
    Validated,
    Routed,
    Generating,
    Validating,
    Executing,
    Reviewing,
    Retrying,
    Done,
    Rejected,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Validated => "validated",
            Self::Routed => "routed",
            Self::Generating => "generating",
            Self::Validating => "validating",
            Self::Executing => "executing",
            Self::Reviewing => "reviewing",
            Self::Retrying => "retrying",
            Self::Done => "done",
            Self::Rejected => "rejected",
        }
    }
}

/// Everything that can happen to a request in flight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum WorkflowEvent {
    InputAllowed,
    InputBlocked { category: GuardrailCategory },
    Classified { intent: Intent },
    DirectResponseReady,
    GenerationRequested,
    CandidateProduced,
    GenerationFailed,
    CandidateAllowed,
    CandidateDenied,
    ExecutionSucceeded,
    ExecutionFailed,
    OutputBlocked { category: GuardrailCategory },
    ResultAccepted,
    ResultImplausible,
    RetryStarted,
}

impl WorkflowEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputAllowed => "input_allowed",
            Self::InputBlocked { .. } => "input_blocked",
            Self::Classified { .. } => "classified",
            Self::DirectResponseReady => "direct_response_ready",
            Self::GenerationRequested => "generation_requested",
            Self::CandidateProduced => "candidate_produced",
            Self::GenerationFailed => "generation_failed",
            Self::CandidateAllowed => "candidate_allowed",
            Self::CandidateDenied => "candidate_denied",
            Self::ExecutionSucceeded => "execution_succeeded",
            Self::ExecutionFailed => "execution_failed",
            Self::OutputBlocked { .. } => "output_blocked",
            Self::ResultAccepted => "result_accepted",
            Self::ResultImplausible => "result_implausible",
            Self::RetryStarted => "retry_started",
        }
    }
}

/// Why a request ended in `Rejected`. Distinguishes exhaustion of the
/// validation loop from exhaustion of the execution loop so callers can
/// tell "the model kept producing bad SQL" apart from "the database
/// kept failing".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RejectionReason {
    GuardrailBlock { direction: GuardrailDirection, category: GuardrailCategory },
    ValidationExhausted,
    ExecutionExhausted,
}

impl RejectionReason {
    pub fn user_message(&self) -> String {
        match self {
            Self::GuardrailBlock { direction: GuardrailDirection::Input, .. } => {
                "Your question was blocked by a safety check. Please rephrase it as a question about the data.".to_string()
            }
            Self::GuardrailBlock { direction: GuardrailDirection::Output, .. } => {
                "The generated query failed a final safety check and was not returned.".to_string()
            }
            Self::ValidationExhausted => {
                "I could not produce a safe query for that question. Try rephrasing it.".to_string()
            }
            Self::ExecutionExhausted => {
                "The query could not be executed successfully. Please try again later.".to_string()
            }
        }
    }
}
