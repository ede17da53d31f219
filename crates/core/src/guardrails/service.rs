//! Process-wide guardrail outcome counters.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{GuardrailCategory, GuardrailDirection, GuardrailSeverity, GuardrailVerdict};

/// Counter key: one tally per `(direction, category, severity)` triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CounterKey {
    pub direction: GuardrailDirection,
    pub category: GuardrailCategory,
    pub severity: GuardrailSeverity,
}

/// Shared tally of guardrail outcomes.
///
/// Constructed once at the composition root and handed by `Arc` to both
/// the validators and the stats surface, so every consumer observes the
/// same counts. Counts only ever increase for the process lifetime.
/// The mutex is held for the duration of a single increment or snapshot
/// copy, never across an await point.
#[derive(Debug, Default)]
pub struct GuardrailService {
    counters: Mutex<BTreeMap<CounterKey, u64>>,
}

impl GuardrailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, verdict: &GuardrailVerdict, direction: GuardrailDirection) {
        let key = CounterKey { direction, category: verdict.category, severity: verdict.severity };
        let mut counters = match self.counters.lock() {
            Ok(counters) => counters,
            Err(poisoned) => poisoned.into_inner(),
        };
        *counters.entry(key).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> BTreeMap<CounterKey, u64> {
        match self.counters.lock() {
            Ok(counters) => counters.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn total_recorded(&self) -> u64 {
        self.snapshot().values().sum()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{CounterKey, GuardrailService};
    use crate::guardrails::{
        GuardrailCategory, GuardrailDirection, GuardrailSeverity, GuardrailVerdict,
    };

    #[test]
    fn record_increments_per_key_tally() {
        let service = GuardrailService::new();
        let block = GuardrailVerdict::block(
            "injection_detection",
            GuardrailCategory::Injection,
            None,
            "blocked",
        );
        let pass = GuardrailVerdict::pass("pii_filter", GuardrailCategory::Pii);

        service.record(&block, GuardrailDirection::Input);
        service.record(&block, GuardrailDirection::Input);
        service.record(&pass, GuardrailDirection::Input);

        let snapshot = service.snapshot();
        let blocked = snapshot[&CounterKey {
            direction: GuardrailDirection::Input,
            category: GuardrailCategory::Injection,
            severity: GuardrailSeverity::Block,
        }];
        assert_eq!(blocked, 2);
        assert_eq!(service.total_recorded(), 3);
    }

    #[test]
    fn counters_are_monotonic_under_concurrent_recording() {
        let service = Arc::new(GuardrailService::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = Arc::clone(&service);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    let verdict = GuardrailVerdict::pass("battery", GuardrailCategory::None);
                    service.record(&verdict, GuardrailDirection::Output);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("recorder thread should not panic");
        }

        assert_eq!(service.total_recorded(), 800);
    }
}
