//! Request lifecycle state machine.
//!
//! The transition function in [`engine`] is pure; the driving loop that
//! calls generators, validators, and executors lives in the agent crate
//! and only feeds events in. Keeping the two apart makes every path
//! through the lifecycle replayable in plain unit tests.

pub mod engine;
pub mod state;
pub mod states;

pub use engine::{transition, TransitionContext, TransitionError, WorkflowTransition};
pub use state::{AgentState, AttemptOutcome, AttemptRecord, QueryCandidate, ToolCall};
pub use states::{RejectionReason, WorkflowEvent, WorkflowState};
