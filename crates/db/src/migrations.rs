use sqlx::migrate::{MigrateError, MigrationType, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// What a migration run changed: the schema steps applied this run and
/// the total number of steps the binary knows about.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub total: usize,
}

/// Applies outstanding migrations and reports which steps ran.
pub async fn run_pending(pool: &DbPool) -> Result<MigrationReport, MigrateError> {
    let before = applied_versions(pool).await;
    MIGRATOR.run(pool).await?;

    let applied = up_steps()
        .filter(|migration| !before.contains(&migration.version))
        .map(describe)
        .collect();
    Ok(MigrationReport { applied, total: up_steps().count() })
}

/// Lists the schema steps not yet applied to this database.
pub async fn pending(pool: &DbPool) -> Result<Vec<String>, MigrateError> {
    let applied = applied_versions(pool).await;
    Ok(up_steps()
        .filter(|migration| !applied.contains(&migration.version))
        .map(describe)
        .collect())
}

fn up_steps() -> impl Iterator<Item = &'static sqlx::migrate::Migration> {
    MIGRATOR
        .iter()
        .filter(|migration| !matches!(migration.migration_type, MigrationType::ReversibleDown))
}

fn describe(migration: &sqlx::migrate::Migration) -> String {
    format!("{:04} {}", migration.version, migration.description)
}

// A database that predates the migration ledger has nothing applied.
async fn applied_versions(pool: &DbPool) -> Vec<i64> {
    sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations")
        .fetch_all(pool)
        .await
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::{pending, run_pending};
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_TABLES: &[&str] = &[
        "customers",
        "products",
        "orders",
        "order_items",
        "reviews",
        "inventory_log",
        "cost_events",
    ];

    async fn table_exists(pool: &sqlx::SqlitePool, name: &str) -> bool {
        sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?1",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("check table")
        .get::<i64, _>("count")
            == 1
    }

    #[tokio::test]
    async fn migrations_create_baseline_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for table in MANAGED_TABLES {
            assert!(table_exists(&pool, table).await, "expected table `{table}` to exist");
        }
    }

    #[tokio::test]
    async fn migration_runs_report_the_steps_they_applied() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");

        let outstanding = pending(&pool).await.expect("list pending");
        assert_eq!(outstanding, vec!["0001 demo schema", "0002 cost events"]);

        let first = run_pending(&pool).await.expect("run migrations");
        assert_eq!(first.applied, outstanding);
        assert_eq!(first.total, 2);

        let second = run_pending(&pool).await.expect("re-run migrations");
        assert!(second.applied.is_empty(), "a second run should apply nothing");
        assert!(pending(&pool).await.expect("list pending").is_empty());
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        for table in MANAGED_TABLES {
            assert!(!table_exists(&pool, table).await, "expected table `{table}` to be removed");
        }
    }

    #[tokio::test]
    async fn migrations_up_down_up_preserves_schema_signature() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let initial = schema_signature(&pool).await;
        assert!(!initial.is_empty());

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");
        run_pending(&pool).await.expect("re-run migrations");

        assert_eq!(schema_signature(&pool).await, initial);
    }

    async fn schema_signature(pool: &sqlx::SqlitePool) -> Vec<(String, String, String)> {
        let mut signature: Vec<(String, String, String)> = sqlx::query(
            "SELECT type, name, IFNULL(sql, '') AS sql
             FROM sqlite_master
             WHERE type IN ('table', 'index') AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%'",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects")
        .into_iter()
        .map(|row| {
            (
                row.get::<String, _>("type"),
                row.get::<String, _>("name"),
                row.get::<String, _>("sql"),
            )
        })
        .collect();
        signature.sort();
        signature
    }
}
