use serde_json::json;

use crate::commands::CommandResult;
use tabula_core::config::{AppConfig, LoadOptions};
use tabula_db::connect_from_config;
use tabula_db::migrations::{self, MigrationReport};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let report = migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<MigrationReport, (&'static str, String, u8)>(report)
    });

    match result {
        Ok(report) => {
            let message = if report.applied.is_empty() {
                format!("schema is up to date ({} migrations present)", report.total)
            } else {
                format!("applied {} of {} migrations", report.applied.len(), report.total)
            };
            CommandResult::report(
                "migrate",
                message,
                Some(json!({ "applied": report.applied, "total": report.total })),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
