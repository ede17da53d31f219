//! Structural SQL validation and extraction.
//!
//! `QueryValidator` is the only gate between generated text and the
//! database: a query reaches execution iff `validate` returns
//! `allowed == true`. It is a pure function of its input; it runs
//! multiple times per request and must stay deterministic and
//! idempotent.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Data-definition and data-modification verbs that must never appear
/// in a generated query, in or out of comments.
const BLOCKED_OPERATIONS: &[&str] = &[
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE", "EXEC", "EXECUTE",
    "GRANT", "REVOKE", "ATTACH", "DETACH", "VACUUM", "REINDEX", "PRAGMA",
];

/// Keywords that the table-reference scan can capture but which are
/// never table names.
const NON_TABLE_KEYWORDS: &[&str] = &[
    "select", "where", "and", "or", "not", "null", "as", "on", "in", "is", "by", "asc", "desc",
    "case", "when", "then", "else", "end", "between", "like", "having", "union", "all", "exists",
    "lateral", "values",
];

static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"'[^']*'").expect("literal regex"));

static BLOCKED_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    let alternation = BLOCKED_OPERATIONS.join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\b")).expect("blocked keyword regex")
});

static TABLE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:FROM|JOIN)\s+(\w+)\s*(\()?").expect("table regex"));

static CTE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bWITH\s+(.*?)\bSELECT\b").expect("cte block regex"));

static CTE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\w+)\s+AS\s*\(").expect("cte name regex"));

static EXTRACT_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bEXTRACT\s*\([^)]*\bFROM\s+(\w+)").expect("extract regex"));

static SQL_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```(?:sql)?\s*\n?(.*?)\n?```").expect("fence regex"));

static BARE_SELECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)((?:WITH\s+.*?\s+AS\s*\(.*?\)\s*)?SELECT\s+.*?)(\n\n|\z)")
        .expect("select regex")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    NotSelectLike,
    ForbiddenKeyword,
    TableNotAllowed,
    MultipleStatements,
    CommentPresent,
    None,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSelectLike => "not_select_like",
            Self::ForbiddenKeyword => "forbidden_keyword",
            Self::TableNotAllowed => "table_not_allowed",
            Self::MultipleStatements => "multiple_statements",
            Self::CommentPresent => "comment_present",
            Self::None => "none",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub allowed: bool,
    pub reason: ValidationReason,
    pub detail: Option<String>,
}

impl ValidationOutcome {
    fn allowed() -> Self {
        Self { allowed: true, reason: ValidationReason::None, detail: None }
    }

    fn denied(reason: ValidationReason, detail: impl Into<String>) -> Self {
        Self { allowed: false, reason, detail: Some(detail.into()) }
    }
}

#[derive(Clone, Debug)]
pub struct QueryValidator {
    allowed_tables: BTreeSet<String>,
}

impl QueryValidator {
    pub fn new<I, S>(allowed_tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_tables: allowed_tables
                .into_iter()
                .map(|table| table.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn allowed_tables(&self) -> impl Iterator<Item = &str> {
        self.allowed_tables.iter().map(String::as_str)
    }

    /// Checks run in a fixed order; the first failure decides `reason`.
    pub fn validate(&self, sql: &str) -> ValidationOutcome {
        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return ValidationOutcome::denied(ValidationReason::NotSelectLike, "empty query text");
        }

        // 1. Leading clause must be a select form or a CTE.
        let upper = trimmed.to_ascii_uppercase();
        if !upper.starts_with("SELECT") && !upper.starts_with("WITH") {
            return ValidationOutcome::denied(
                ValidationReason::NotSelectLike,
                "only SELECT or WITH queries are allowed",
            );
        }

        // 2. No DDL/DML verb anywhere outside string literals. Comments
        //    are deliberately NOT stripped first, so a keyword hidden in
        //    a comment is still caught here.
        let without_literals = STRING_LITERAL.replace_all(trimmed, "");
        if let Some(found) = BLOCKED_KEYWORD.find(&without_literals) {
            return ValidationOutcome::denied(
                ValidationReason::ForbiddenKeyword,
                format!("blocked operation detected: {}", found.as_str().to_ascii_uppercase()),
            );
        }

        // 3. Every resolved table reference must be allowlisted.
        if let Some(table) = self.first_disallowed_table(&without_literals) {
            return ValidationOutcome::denied(
                ValidationReason::TableNotAllowed,
                format!("referenced disallowed table: {table}"),
            );
        }

        // 4. No statement separator beyond a single terminating one.
        let body = without_literals.trim_end().trim_end_matches(';');
        if body.contains(';') {
            return ValidationOutcome::denied(
                ValidationReason::MultipleStatements,
                "multiple statements are not allowed",
            );
        }

        // 5. No comment markers; hiding tokens inside comments is a
        //    known bypass vector for naive substring checkers.
        if without_literals.contains("--") || without_literals.contains("/*") {
            return ValidationOutcome::denied(
                ValidationReason::CommentPresent,
                "SQL comments are not allowed in generated queries",
            );
        }

        ValidationOutcome::allowed()
    }

    fn first_disallowed_table(&self, without_literals: &str) -> Option<String> {
        let cte_names = collect_cte_names(without_literals);
        let extract_columns = EXTRACT_COLUMN
            .captures_iter(without_literals)
            .map(|capture| capture[1].to_ascii_lowercase())
            .collect::<BTreeSet<_>>();

        for capture in TABLE_REFERENCE.captures_iter(without_literals) {
            // A parenthesis after the captured word means a subquery or
            // a table-valued function, not a table name.
            if capture.get(2).is_some() {
                continue;
            }
            let name = capture[1].to_ascii_lowercase();
            if cte_names.contains(&name)
                || extract_columns.contains(&name)
                || NON_TABLE_KEYWORDS.contains(&name.as_str())
            {
                continue;
            }
            // Short identifiers are almost always aliases (`orders o`);
            // anything longer must be on the allowlist.
            if name.len() <= 3 {
                continue;
            }
            if !self.allowed_tables.contains(&name) {
                return Some(name);
            }
        }
        None
    }
}

fn collect_cte_names(sql: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    if let Some(block) = CTE_BLOCK.captures(sql) {
        for capture in CTE_NAME.captures_iter(&block[1]) {
            names.insert(capture[1].to_ascii_lowercase());
        }
    }
    names
}

/// Cleans a query for validation and execution: trims whitespace,
/// removes markdown fences, and drops the trailing semicolon.
pub fn sanitize_sql(sql: &str) -> String {
    let mut text = sql.trim().to_string();
    if text.starts_with("```") {
        text = text
            .lines()
            .filter(|line| !line.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n");
    }
    text.trim().trim_end_matches(';').trim().to_string()
}

/// Pulls a SQL query out of an LLM response that may wrap it in
/// markdown or surround it with prose.
pub fn extract_sql_from_response(text: &str) -> String {
    if let Some(capture) = SQL_CODE_FENCE.captures(text) {
        return sanitize_sql(&capture[1]);
    }
    if let Some(capture) = BARE_SELECT.captures(text) {
        return sanitize_sql(&capture[1]);
    }
    sanitize_sql(text)
}
