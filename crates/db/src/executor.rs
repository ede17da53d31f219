//! Read-only query execution against the demo schema.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use tabula_core::domain::{ResultRow, ResultSet};
use tabula_core::exec::{ExecutionError, QueryExecutor};

use crate::DbPool;

/// Executes validated SQL against the pool with a wall-clock timeout
/// and a hard row cap. Refuses non-select statements on its own, even
/// though validated SQL is the only thing that should ever reach it.
pub struct SqliteQueryExecutor {
    pool: DbPool,
    max_rows: usize,
    timeout: Duration,
}

impl SqliteQueryExecutor {
    pub fn new(pool: DbPool, max_rows: usize, timeout_secs: u64) -> Self {
        Self { pool, max_rows: max_rows.max(1), timeout: Duration::from_secs(timeout_secs.max(1)) }
    }
}

#[async_trait]
impl QueryExecutor for SqliteQueryExecutor {
    async fn execute(&self, sql: &str) -> Result<ResultSet, ExecutionError> {
        let upper = sql.trim_start().to_ascii_uppercase();
        if !upper.starts_with("SELECT") && !upper.starts_with("WITH") {
            return Err(ExecutionError::Malformed {
                message: "only SELECT statements can be executed".to_string(),
            });
        }

        let started = Instant::now();
        let fetched = match tokio::time::timeout(self.timeout, sqlx::query(sql).fetch_all(&self.pool)).await
        {
            Err(_) => {
                return Err(ExecutionError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
            Ok(Ok(rows)) => rows,
            Ok(Err(error)) => return Err(map_sqlx_error(error)),
        };
        let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        let truncated = fetched.len() > self.max_rows;
        let kept = &fetched[..fetched.len().min(self.max_rows)];

        let columns = kept
            .first()
            .map(|row| row.columns().iter().map(|column| column.name().to_string()).collect())
            .unwrap_or_default();

        let rows = kept.iter().map(decode_row).collect::<Vec<_>>();
        let row_count = rows.len();

        Ok(ResultSet { columns, rows, row_count, truncated, execution_time_ms })
    }
}

fn decode_row(row: &SqliteRow) -> ResultRow {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), decode_value(row, column.ordinal())))
        .collect()
}

fn decode_value(row: &SqliteRow, index: usize) -> Value {
    let raw = match row.try_get_raw(index) {
        Ok(raw) => raw,
        Err(_) => return Value::Null,
    };
    if raw.is_null() {
        return Value::Null;
    }

    match raw.type_info().name().to_ascii_uppercase().as_str() {
        "INTEGER" | "BOOLEAN" => {
            row.try_get::<i64, _>(index).map(Value::from).unwrap_or(Value::Null)
        }
        "REAL" => row
            .try_get::<f64, _>(index)
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        // Blobs have no JSON shape worth exposing to callers.
        "BLOB" => Value::Null,
        _ => row.try_get::<String, _>(index).map(Value::String).unwrap_or(Value::Null),
    }
}

fn map_sqlx_error(error: sqlx::Error) -> ExecutionError {
    match error {
        sqlx::Error::Database(db_error) => {
            ExecutionError::Malformed { message: db_error.message().to_string() }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
            ExecutionError::ConnectionLost { message: "connection pool unavailable".to_string() }
        }
        sqlx::Error::Io(io_error) => {
            ExecutionError::ConnectionLost { message: io_error.to_string() }
        }
        other => ExecutionError::Malformed { message: other.to_string() },
    }
}
