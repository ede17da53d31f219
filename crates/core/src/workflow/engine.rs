//! Pure transition function over the lifecycle states.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::states::{RejectionReason, WorkflowEvent, WorkflowState};
use crate::guardrails::GuardrailDirection;

/// Retry bookkeeping the transition function needs to decide between
/// `Retrying` and a terminal state. `attempts_used` counts generation
/// attempts already consumed, including the one that just failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionContext {
    pub attempts_used: u32,
    pub max_attempts: u32,
}

impl TransitionContext {
    pub fn new(attempts_used: u32, max_attempts: u32) -> Self {
        Self { attempts_used, max_attempts }
    }

    pub fn attempts_remaining(&self) -> bool {
        self.attempts_used < self.max_attempts
    }
}

/// One accepted transition. `rejection` is populated exactly when `to`
/// is [`WorkflowState::Rejected`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTransition {
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub event: WorkflowEvent,
    pub rejection: Option<RejectionReason>,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("event `{event}` is not valid in state `{state}`")]
    InvalidTransition { state: &'static str, event: &'static str },
}

/// Applies one event to the current state.
///
/// Total over the legal (state, event) pairs and side-effect free, so
/// any recorded event sequence can be replayed to the same terminal
/// state. Events arriving in a terminal state are always an error.
pub fn transition(
    current: WorkflowState,
    event: WorkflowEvent,
    ctx: TransitionContext,
) -> Result<WorkflowTransition, TransitionError> {
    use WorkflowEvent as E;
    use WorkflowState as S;

    let (to, rejection) = match (current, &event) {
        (S::Start, E::InputAllowed) => (S::Validated, None),
        (S::Start, E::InputBlocked { category }) => (
            S::Rejected,
            Some(RejectionReason::GuardrailBlock {
                direction: GuardrailDirection::Input,
                category: *category,
            }),
        ),

        (S::Validated, E::Classified { .. }) => (S::Routed, None),

        (S::Routed, E::DirectResponseReady) => (S::Done, None),
        (S::Routed, E::GenerationRequested) => (S::Generating, None),

        (S::Generating, E::CandidateProduced) => (S::Validating, None),
        (S::Generating, E::GenerationFailed) => {
            retry_or_reject(ctx, RejectionReason::ExecutionExhausted)
        }

        (S::Validating, E::CandidateAllowed) => (S::Executing, None),
        (S::Validating, E::CandidateDenied) => {
            retry_or_reject(ctx, RejectionReason::ValidationExhausted)
        }

        (S::Executing, E::ExecutionSucceeded) => (S::Reviewing, None),
        (S::Executing, E::ExecutionFailed) => {
            retry_or_reject(ctx, RejectionReason::ExecutionExhausted)
        }

        // An output-side guardrail failure is terminal regardless of
        // how many attempts are left.
        (S::Reviewing, E::OutputBlocked { category }) => (
            S::Rejected,
            Some(RejectionReason::GuardrailBlock {
                direction: GuardrailDirection::Output,
                category: *category,
            }),
        ),
        (S::Reviewing, E::ResultAccepted) => (S::Done, None),
        // An implausible but safe result with no attempts left is still
        // returned to the caller, flagged, rather than rejected.
        (S::Reviewing, E::ResultImplausible) => {
            if ctx.attempts_remaining() {
                (S::Retrying, None)
            } else {
                (S::Done, None)
            }
        }

        (S::Retrying, E::RetryStarted) => (S::Generating, None),

        _ => {
            return Err(TransitionError::InvalidTransition {
                state: current.as_str(),
                event: event.as_str(),
            })
        }
    };

    Ok(WorkflowTransition { from: current, to, event, rejection })
}

fn retry_or_reject(
    ctx: TransitionContext,
    reason: RejectionReason,
) -> (WorkflowState, Option<RejectionReason>) {
    if ctx.attempts_remaining() {
        (WorkflowState::Retrying, None)
    } else {
        (WorkflowState::Rejected, Some(reason))
    }
}
