//! SQLite pool setup tuned for the read-mostly analytics workload.

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use tabula_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Ceiling for the per-connection busy handler. Waiting longer than
/// this inside SQLite would starve the pool's own acquire deadline.
const MAX_BUSY_WAIT_SECS: u64 = 30;

pub async fn connect_from_config(database: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&database.url, database.max_connections, database.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let acquire_timeout_secs = timeout_secs.max(1);
    let busy_timeout_ms = busy_wait_ms(acquire_timeout_secs);

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                for pragma in session_pragmas(busy_timeout_ms) {
                    sqlx::query(&pragma).execute(&mut *conn).await?;
                }
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// The busy handler tracks the acquire deadline so a write lock held
/// by another connection surfaces as a slow query, not a pool error.
fn busy_wait_ms(acquire_timeout_secs: u64) -> u64 {
    acquire_timeout_secs.min(MAX_BUSY_WAIT_SECS) * 1000
}

/// Per-session pragmas: referential integrity for the demo schema and
/// WAL so executor reads proceed while cost events are appended.
fn session_pragmas(busy_timeout_ms: u64) -> Vec<String> {
    vec![
        "PRAGMA foreign_keys = ON".to_string(),
        "PRAGMA journal_mode = WAL".to_string(),
        format!("PRAGMA busy_timeout = {busy_timeout_ms}"),
    ]
}
