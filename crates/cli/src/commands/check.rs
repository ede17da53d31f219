use std::sync::Arc;

use serde::Serialize;

use crate::commands::CommandResult;
use tabula_core::config::{AppConfig, LoadOptions};
use tabula_core::guardrails::{GuardrailService, InputValidator};
use tabula_core::sql::{QueryValidator, ValidationOutcome};

#[derive(Debug, Serialize)]
struct CheckVerdict {
    name: String,
    passed: bool,
    category: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    command: &'static str,
    allowed: bool,
    input_checks: Vec<CheckVerdict>,
    sql: Option<ValidationOutcome>,
}

/// Dry run: evaluates a text the way the server would, without
/// generating or executing anything. SQL validation only applies when
/// the text itself is a select-form statement.
pub fn run(text: &str, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "check",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let service = Arc::new(GuardrailService::new());
    let validator = InputValidator::new(
        config.guardrails.min_query_chars,
        config.guardrails.max_query_chars,
        service,
    );
    let report = validator.evaluate(text);

    let sql = looks_like_sql(text)
        .then(|| QueryValidator::new(&config.guardrails.allowed_tables).validate(text));

    let allowed = report.allowed() && sql.as_ref().map(|outcome| outcome.allowed).unwrap_or(true);
    let payload = CheckReport {
        command: "check",
        allowed,
        input_checks: report
            .verdicts
            .iter()
            .map(|verdict| CheckVerdict {
                name: verdict.name.to_string(),
                passed: verdict.passed,
                category: verdict.category.as_str().to_string(),
                message: verdict.message.clone(),
            })
            .collect(),
        sql,
    };

    let output = if json_output {
        serde_json::to_string_pretty(&payload)
            .unwrap_or_else(|error| format!("{{\"command\":\"check\",\"error\":\"{error}\"}}"))
    } else {
        render_human(&payload)
    };

    CommandResult { exit_code: u8::from(!allowed), output }
}

fn looks_like_sql(text: &str) -> bool {
    let head = text.trim_start().to_ascii_lowercase();
    head.starts_with("select") || head.starts_with("with")
}

fn render_human(report: &CheckReport) -> String {
    let mut lines =
        vec![format!("check: {}", if report.allowed { "allowed" } else { "blocked" })];

    for verdict in &report.input_checks {
        let marker = if verdict.passed { "ok" } else { "flag" };
        let mut line = format!("- [{marker}] {} ({})", verdict.name, verdict.category);
        if !verdict.message.is_empty() {
            line.push_str(&format!(": {}", verdict.message));
        }
        lines.push(line);
    }

    if let Some(sql) = &report.sql {
        let marker = if sql.allowed { "ok" } else { "deny" };
        let mut line = format!("- [{marker}] sql_validation ({})", sql.reason.as_str());
        if let Some(detail) = &sql.detail {
            line.push_str(&format!(": {detail}"));
        }
        lines.push(line);
    }

    lines.join("\n")
}
