//! Input/output guardrail pipelines and the shared outcome counters.

pub mod input;
pub mod output;
pub mod patterns;
pub mod service;

use serde::{Deserialize, Serialize};

pub use input::InputValidator;
pub use output::OutputValidator;
pub use service::{CounterKey, GuardrailService};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailCategory {
    Injection,
    Pii,
    OffTopic,
    LengthViolation,
    None,
}

impl GuardrailCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Injection => "injection",
            Self::Pii => "pii",
            Self::OffTopic => "off_topic",
            Self::LengthViolation => "length_violation",
            Self::None => "none",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailSeverity {
    Block,
    Warn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailDirection {
    Input,
    Output,
}

/// Outcome of a single guardrail check. Immutable once produced; every
/// verdict, pass or fail, is forwarded to [`GuardrailService`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GuardrailVerdict {
    pub name: &'static str,
    pub passed: bool,
    pub category: GuardrailCategory,
    pub severity: GuardrailSeverity,
    pub matched_pattern: Option<String>,
    pub message: String,
}

impl GuardrailVerdict {
    pub fn pass(name: &'static str, category: GuardrailCategory) -> Self {
        Self {
            name,
            passed: true,
            category,
            severity: GuardrailSeverity::Warn,
            matched_pattern: None,
            message: String::new(),
        }
    }

    pub fn block(
        name: &'static str,
        category: GuardrailCategory,
        matched_pattern: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name,
            passed: false,
            category,
            severity: GuardrailSeverity::Block,
            matched_pattern,
            message: message.into(),
        }
    }

    pub fn warn(
        name: &'static str,
        category: GuardrailCategory,
        matched_pattern: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name,
            passed: false,
            category,
            severity: GuardrailSeverity::Warn,
            matched_pattern,
            message: message.into(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        !self.passed && self.severity == GuardrailSeverity::Block
    }
}

/// Result of running a full guardrail battery over one text.
///
/// All checks run and are recorded regardless of outcome; `decision`
/// is the first blocking verdict when one exists, otherwise a synthetic
/// pass covering the whole battery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GuardrailReport {
    pub verdicts: Vec<GuardrailVerdict>,
    pub decision: GuardrailVerdict,
}

impl GuardrailReport {
    pub fn from_verdicts(verdicts: Vec<GuardrailVerdict>) -> Self {
        let decision = verdicts
            .iter()
            .find(|verdict| verdict.is_blocking())
            .cloned()
            .unwrap_or_else(|| GuardrailVerdict::pass("battery", GuardrailCategory::None));
        Self { verdicts, decision }
    }

    pub fn allowed(&self) -> bool {
        !self.decision.is_blocking()
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.decision.is_blocking().then_some(self.decision.message.as_str())
    }

    /// Categories of every non-passing verdict, in battery order.
    pub fn flagged_categories(&self) -> Vec<GuardrailCategory> {
        self.verdicts
            .iter()
            .filter(|verdict| !verdict.passed)
            .map(|verdict| verdict.category)
            .collect()
    }
}
