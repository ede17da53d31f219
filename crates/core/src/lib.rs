//! Guardrail-validated query workflow core.
//!
//! This crate holds everything that must stay pure and deterministic:
//! the guardrail pipelines, the structural SQL validator, the intent
//! router, the workflow state machine, the shared guardrail counter
//! service, and the configuration/error layers. Anything that performs
//! I/O (the LLM client, the SQLite executor, the HTTP surface) lives in
//! the sibling crates and plugs into the traits defined here.

pub mod config;
pub mod cost;
pub mod domain;
pub mod errors;
pub mod exec;
pub mod guardrails;
pub mod router;
pub mod sql;
pub mod workflow;
