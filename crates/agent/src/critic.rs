//! Deterministic plausibility review of executed results.

use once_cell::sync::Lazy;
use regex::Regex;

use tabula_core::domain::ResultSet;

static LISTING_CUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(list|show|top\s+\d+|which|what\s+are|give\s+me)\b").expect("listing regex")
});

static AGGREGATE_CUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(how\s+many|how\s+much|count|total|sum|average|avg)\b")
        .expect("aggregate regex")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CriticVerdict {
    Plausible,
    Implausible { reason: String },
}

/// Rule-based sanity check over the shape of a result relative to the
/// question's phrasing. The critic never inspects row contents for
/// correctness; it only flags shapes that are unlikely to answer the
/// question, which makes it deterministic and cheap to re-run.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResultCritic;

impl ResultCritic {
    pub fn new() -> Self {
        Self
    }

    pub fn review(&self, question: &str, result: &ResultSet) -> CriticVerdict {
        if result.is_empty() && LISTING_CUES.is_match(question) {
            return CriticVerdict::Implausible {
                reason: "the question asks for a listing but the query returned no rows"
                    .to_string(),
            };
        }

        if AGGREGATE_CUES.is_match(question)
            && result.row_count > 1
            && result.first_numeric_column().is_none()
        {
            return CriticVerdict::Implausible {
                reason: "the question asks for an aggregate but the result has many rows and no numeric column"
                    .to_string(),
            };
        }

        CriticVerdict::Plausible
    }
}
