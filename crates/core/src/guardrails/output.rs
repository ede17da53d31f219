//! Output-side guardrails: SQL re-validation and result masking.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use super::patterns::SQL_INJECTION_PATTERNS;
use super::{
    GuardrailCategory, GuardrailDirection, GuardrailReport, GuardrailService, GuardrailVerdict,
};
use crate::domain::ResultSet;
use crate::sql::QueryValidator;

/// Final gate before results leave the engine.
///
/// The SQL that actually executed is validated again from scratch; the
/// output side never trusts that the input-side check already ran.
/// A failure here is terminal, no retry is offered.
pub struct OutputValidator {
    validator: QueryValidator,
    sensitive_columns: BTreeSet<String>,
    visible_chars: usize,
    masking_char: char,
    service: Arc<GuardrailService>,
}

impl OutputValidator {
    pub fn new<I, S>(
        validator: QueryValidator,
        sensitive_columns: I,
        visible_chars: usize,
        masking_char: char,
        service: Arc<GuardrailService>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            validator,
            sensitive_columns: sensitive_columns
                .into_iter()
                .map(|column| column.as_ref().to_ascii_lowercase())
                .collect(),
            visible_chars,
            masking_char,
            service,
        }
    }

    /// Re-runs the structural validator and the SQL-injection corpus
    /// over the executed query text.
    pub fn evaluate_sql(&self, executed_sql: &str) -> GuardrailReport {
        let verdicts = vec![self.check_structure(executed_sql), self.check_injection(executed_sql)];
        for verdict in &verdicts {
            self.service.record(verdict, GuardrailDirection::Output);
        }
        GuardrailReport::from_verdicts(verdicts)
    }

    fn check_structure(&self, sql: &str) -> GuardrailVerdict {
        let outcome = self.validator.validate(sql);
        if outcome.allowed {
            GuardrailVerdict::pass("sql_revalidation", GuardrailCategory::Injection)
        } else {
            GuardrailVerdict::block(
                "sql_revalidation",
                GuardrailCategory::Injection,
                Some(outcome.reason.as_str().to_string()),
                outcome
                    .detail
                    .unwrap_or_else(|| "executed SQL failed structural validation".to_string()),
            )
        }
    }

    fn check_injection(&self, sql: &str) -> GuardrailVerdict {
        match SQL_INJECTION_PATTERNS.iter().find_map(|pattern| pattern.find(sql)) {
            Some(found) => GuardrailVerdict::block(
                "sql_injection_scan",
                GuardrailCategory::Injection,
                Some(found.as_str().to_string()),
                "Executed SQL matched an injection signature.",
            ),
            None => GuardrailVerdict::pass("sql_injection_scan", GuardrailCategory::Injection),
        }
    }

    /// Masks values in sensitive columns in place and returns the
    /// affected column names. Row and column shape is never changed.
    pub fn mask_sensitive(&self, result: &mut ResultSet) -> Vec<String> {
        let targets = result
            .columns
            .iter()
            .filter(|column| self.sensitive_columns.contains(&column.to_ascii_lowercase()))
            .cloned()
            .collect::<Vec<_>>();

        if targets.is_empty() {
            return targets;
        }

        for row in &mut result.rows {
            for column in &targets {
                if let Some(value) = row.get_mut(column) {
                    *value = self.mask_value(value);
                }
            }
        }

        let verdict = GuardrailVerdict::warn(
            "output_masking",
            GuardrailCategory::Pii,
            Some(targets.join(", ")),
            format!("Masked sensitive columns: {}", targets.join(", ")),
        );
        self.service.record(&verdict, GuardrailDirection::Output);
        targets
    }

    fn mask_value(&self, value: &Value) -> Value {
        let text = match value {
            Value::Null => return Value::Null,
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let chars = text.chars().collect::<Vec<_>>();
        // Values too short to safely reveal a prefix are masked whole.
        let masked = if chars.len() <= self.visible_chars {
            self.masking_char.to_string().repeat(chars.len().max(1))
        } else {
            let mut out = chars[..self.visible_chars].iter().collect::<String>();
            out.extend(std::iter::repeat(self.masking_char).take(chars.len() - self.visible_chars));
            out
        };
        Value::String(masked)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::OutputValidator;
    use crate::domain::{ResultRow, ResultSet};
    use crate::guardrails::{GuardrailCategory, GuardrailService};
    use crate::sql::QueryValidator;

    fn output_validator(service: &Arc<GuardrailService>) -> OutputValidator {
        OutputValidator::new(
            QueryValidator::new(["customers", "orders"]),
            ["email", "phone"],
            3,
            '*',
            Arc::clone(service),
        )
    }

    fn row(pairs: &[(&str, serde_json::Value)]) -> ResultRow {
        pairs.iter().map(|(key, value)| (key.to_string(), value.clone())).collect()
    }

    #[test]
    fn clean_executed_sql_passes_revalidation() {
        let service = Arc::new(GuardrailService::new());
        let report = output_validator(&service).evaluate_sql("SELECT id, email FROM customers");
        assert!(report.allowed());
    }

    #[test]
    fn stacked_statement_fails_both_checks() {
        let service = Arc::new(GuardrailService::new());
        let report = output_validator(&service)
            .evaluate_sql("SELECT * FROM customers; DROP TABLE customers");

        assert!(!report.allowed());
        assert_eq!(report.decision.category, GuardrailCategory::Injection);
        assert_eq!(report.verdicts.iter().filter(|verdict| !verdict.passed).count(), 2);
    }

    #[test]
    fn union_injection_shape_is_blocked() {
        let service = Arc::new(GuardrailService::new());
        let report = output_validator(&service)
            .evaluate_sql("SELECT name FROM customers UNION SELECT sql FROM orders");
        assert!(!report.allowed());
    }

    #[test]
    fn masking_keeps_prefix_and_preserves_shape() {
        let service = Arc::new(GuardrailService::new());
        let mut result = ResultSet {
            columns: vec!["name".to_string(), "email".to_string()],
            rows: vec![
                row(&[("name", json!("Jane")), ("email", json!("jane.doe@example.com"))]),
                row(&[("name", json!("Bob")), ("email", json!("bo@x.io"))]),
            ],
            row_count: 2,
            truncated: false,
            execution_time_ms: 2.0,
        };

        let masked = output_validator(&service).mask_sensitive(&mut result);

        assert_eq!(masked, vec!["email".to_string()]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0]["email"], json!("jan*****************"));
        assert_eq!(result.rows[0]["name"], json!("Jane"));
        assert_eq!(result.rows[1]["email"], json!("bo@****"));
    }

    #[test]
    fn short_sensitive_values_are_fully_masked() {
        let service = Arc::new(GuardrailService::new());
        let mut result = ResultSet {
            columns: vec!["phone".to_string()],
            rows: vec![row(&[("phone", json!("555"))])],
            row_count: 1,
            truncated: false,
            execution_time_ms: 0.5,
        };

        output_validator(&service).mask_sensitive(&mut result);
        assert_eq!(result.rows[0]["phone"], json!("***"));
    }

    #[test]
    fn null_sensitive_values_stay_null() {
        let service = Arc::new(GuardrailService::new());
        let mut result = ResultSet {
            columns: vec!["email".to_string()],
            rows: vec![row(&[("email", serde_json::Value::Null)])],
            row_count: 1,
            truncated: false,
            execution_time_ms: 0.5,
        };

        output_validator(&service).mask_sensitive(&mut result);
        assert!(result.rows[0]["email"].is_null());
    }
}
