//! Result-shaping tools: chart specs and markdown reports.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tera::{Context, Tera};

use tabula_core::domain::{ChartKind, ChartSpec, ReportArtifact, ResultSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolName {
    QueryExecute,
    ChartGenerate,
    ReportGenerate,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QueryExecute => "query_execute",
            Self::ChartGenerate => "chart_generate",
            Self::ReportGenerate => "report_generate",
        }
    }
}

static PIE_CUES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(pie|share|proportion|percentage)\b").expect("pie cue regex"));
static LINE_CUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(line|trend|over\s+time|monthly|weekly|daily)\b").expect("line cue regex")
});

/// Derives a declarative chart from a result set: the first textual
/// column becomes the label axis, the first numeric column the series.
/// Returns `None` when the shape does not support a chart.
pub fn build_chart_spec(question: &str, result: &ResultSet) -> Option<ChartSpec> {
    let y_column = result.first_numeric_column()?.to_string();
    let x_column = result.columns.iter().find(|column| **column != y_column)?.clone();

    let mut labels = Vec::with_capacity(result.rows.len());
    let mut values = Vec::with_capacity(result.rows.len());
    for row in &result.rows {
        let label = row.get(&x_column).map(display_value).unwrap_or_default();
        let value = row.get(&y_column).and_then(Value::as_f64).unwrap_or(0.0);
        labels.push(label);
        values.push(value);
    }
    if labels.is_empty() {
        return None;
    }

    let kind = if PIE_CUES.is_match(question) {
        ChartKind::Pie
    } else if LINE_CUES.is_match(question) {
        ChartKind::Line
    } else {
        ChartKind::Bar
    };

    Some(ChartSpec {
        kind,
        title: question.trim().to_string(),
        x_column,
        y_column,
        labels,
        values,
    })
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

const REPORT_TEMPLATE: &str = "\
# {{ question }}

{% for finding in findings %}- {{ finding }}
{% endfor %}
| {{ columns | join(sep=\" | \") }} |
|{% for column in columns %} --- |{% endfor %}
{% for row in rows %}| {% for column in columns %}{{ row[column] }} | {% endfor %}
{% endfor %}";

const REPORT_ROW_LIMIT: usize = 20;

/// Renders a markdown report over the (already masked) result set.
pub fn render_report(question: &str, result: &ResultSet) -> Result<ReportArtifact, tera::Error> {
    let key_findings = collect_findings(result);

    let rows: Vec<&_> = result.rows.iter().take(REPORT_ROW_LIMIT).collect();
    let mut context = Context::new();
    context.insert("question", question.trim());
    context.insert("columns", &result.columns);
    context.insert("rows", &rows);
    context.insert("findings", &key_findings);

    let markdown = Tera::one_off(REPORT_TEMPLATE, &context, false)?;
    Ok(ReportArtifact { markdown, key_findings })
}

fn collect_findings(result: &ResultSet) -> Vec<String> {
    let mut findings = Vec::new();
    if result.truncated {
        findings.push(format!("Showing the first {} rows; the result was truncated.", result.row_count));
    } else {
        findings.push(format!("The query returned {} row(s).", result.row_count));
    }

    if let Some(column) = result.first_numeric_column() {
        let mut best: Option<(f64, usize)> = None;
        for (index, row) in result.rows.iter().enumerate() {
            if let Some(value) = row.get(column).and_then(Value::as_f64) {
                if best.map(|(max, _)| value > max).unwrap_or(true) {
                    best = Some((value, index));
                }
            }
        }
        if let Some((value, index)) = best {
            let label = result
                .columns
                .iter()
                .find(|candidate| candidate.as_str() != column)
                .and_then(|label_column| result.rows[index].get(label_column))
                .map(display_value)
                .unwrap_or_else(|| format!("row {}", index + 1));
            findings.push(format!("Highest `{column}`: {value} ({label})."));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use tabula_core::domain::{ChartKind, ResultRow, ResultSet};

    use super::{build_chart_spec, render_report};

    fn result() -> ResultSet {
        let row = |name: &str, revenue: f64| -> ResultRow {
            [("name".to_string(), json!(name)), ("revenue".to_string(), json!(revenue))]
                .into_iter()
                .collect()
        };
        ResultSet {
            columns: vec!["name".to_string(), "revenue".to_string()],
            rows: vec![row("Walnut Desk", 1796.0), row("Ergo Chair", 598.0)],
            row_count: 2,
            truncated: false,
            execution_time_ms: 3.0,
        }
    }

    #[test]
    fn chart_uses_text_labels_and_numeric_series() {
        let spec = build_chart_spec("Chart revenue by product", &result())
            .expect("chart should be derivable");

        assert_eq!(spec.kind, ChartKind::Bar);
        assert_eq!(spec.x_column, "name");
        assert_eq!(spec.y_column, "revenue");
        assert_eq!(spec.labels, vec!["Walnut Desk", "Ergo Chair"]);
        assert_eq!(spec.values, vec![1796.0, 598.0]);
    }

    #[test]
    fn trend_phrasing_selects_a_line_chart() {
        let spec = build_chart_spec("revenue trend over time by month", &result())
            .expect("chart should be derivable");
        assert_eq!(spec.kind, ChartKind::Line);
    }

    #[test]
    fn all_text_result_yields_no_chart() {
        let row: ResultRow = [("name".to_string(), json!("Walnut Desk"))].into_iter().collect();
        let result = ResultSet {
            columns: vec!["name".to_string()],
            rows: vec![row],
            row_count: 1,
            truncated: false,
            execution_time_ms: 1.0,
        };
        assert!(build_chart_spec("chart it", &result).is_none());
    }

    #[test]
    fn report_contains_table_and_findings() {
        let report = render_report("Revenue by product", &result()).expect("render");

        assert!(report.markdown.contains("# Revenue by product"));
        assert!(report.markdown.contains("Walnut Desk"));
        assert!(report.key_findings.iter().any(|finding| finding.contains("2 row(s)")));
        assert!(report.key_findings.iter().any(|finding| finding.contains("Walnut Desk")));
    }
}
