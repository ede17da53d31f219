//! Agent runtime: drives one question through guardrails, routing,
//! SQL generation, validation, execution, and review.
//!
//! The runtime is a thin driving loop around the pure state machine in
//! `tabula-core`. The LLM is strictly a translator from natural
//! language to candidate SQL; whether a candidate runs, and what leaves
//! the engine afterwards, is decided by deterministic validators.

pub mod critic;
pub mod generator;
pub mod llm;
pub mod prompts;
pub mod runtime;
pub mod tools;

pub use llm::{HttpLlmClient, LlmClient, LlmCompletion, LlmError, ScriptedLlm};
pub use runtime::AgentRuntime;
