//! Deterministic intent classification for validated questions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    General,
    DataQuery,
    Visualization,
    Report,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::DataQuery => "data_query",
            Self::Visualization => "visualization",
            Self::Report => "report",
        }
    }

    /// Whether this intent drives the generate/validate/execute loop.
    pub fn needs_sql(&self) -> bool {
        !matches!(self, Self::General)
    }
}

static VISUALIZATION_CUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(chart|graph|plot|visuali[sz]e|visuali[sz]ation|bar\s+chart|line\s+chart|pie\s+chart|histogram|draw)\b",
    )
    .expect("visualization cue regex")
});

static REPORT_CUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(report|summary|summari[sz]e|overview|breakdown|digest|executive)\b")
        .expect("report cue regex")
});

static DATA_QUERY_CUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(how\s+many|how\s+much|count|total|average|avg|sum|list|show|top|bottom|highest|lowest|most|least|revenue|sales|orders?|customers?|products?|per|between|trend|compare|percentage|median)\b",
    )
    .expect("data query cue regex")
});

/// Keyword router over validated input text.
///
/// Classification is pure and deterministic: the same text always maps
/// to the same intent. Cue families are checked in precedence order,
/// visualization before report before plain data query, because a
/// charting request almost always also contains data-query phrasing.
/// Text matching no family falls back to `General`, which answers
/// without touching the database.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntentRouter;

impl IntentRouter {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> Intent {
        if VISUALIZATION_CUES.is_match(text) {
            Intent::Visualization
        } else if REPORT_CUES.is_match(text) {
            Intent::Report
        } else if DATA_QUERY_CUES.is_match(text) {
            Intent::DataQuery
        } else {
            Intent::General
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Intent, IntentRouter};

    #[test]
    fn data_question_routes_to_data_query() {
        let router = IntentRouter::new();
        assert_eq!(router.classify("Show me the top 5 products by revenue"), Intent::DataQuery);
        assert_eq!(router.classify("How many orders were placed last week?"), Intent::DataQuery);
    }

    #[test]
    fn chart_phrasing_wins_over_data_query_phrasing() {
        let router = IntentRouter::new();
        assert_eq!(
            router.classify("Plot a bar chart of monthly revenue by region"),
            Intent::Visualization
        );
        assert_eq!(router.classify("visualise order volume over time"), Intent::Visualization);
    }

    #[test]
    fn report_phrasing_routes_to_report() {
        let router = IntentRouter::new();
        assert_eq!(
            router.classify("Give me an executive summary of last quarter's sales"),
            Intent::Report
        );
    }

    #[test]
    fn ambiguous_text_falls_back_to_general() {
        let router = IntentRouter::new();
        assert_eq!(router.classify("hello there"), Intent::General);
        assert_eq!(router.classify("what can you do?"), Intent::General);
    }

    #[test]
    fn classification_is_deterministic() {
        let router = IntentRouter::new();
        let text = "show total revenue per product category";
        let first = router.classify(text);
        for _ in 0..10 {
            assert_eq!(router.classify(text), first);
        }
    }
}
