//! Execution seam between the workflow loop and the storage layer.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ResultSet;

/// Failures surfaced by a query backend. `Timeout` and `ConnectionLost`
/// are transient and worth a retry; `Malformed` means the candidate SQL
/// itself is wrong and a retry needs a new candidate.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("query execution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("query is malformed: {message}")]
    Malformed { message: String },

    #[error("database connection lost: {message}")]
    ConnectionLost { message: String },
}

impl ExecutionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ConnectionLost { .. })
    }
}

/// Read-only query backend. Implementations must refuse anything that
/// is not a single select-form statement, independent of the validation
/// that happens upstream.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<ResultSet, ExecutionError>;
}
