// autofix-rs/src/tracker.rs
// Outcome tracking: feeds observed results back into reinforcement and
// keeps running decision statistics.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use oracle_kb::store::{PatternStore, StoreError};

use crate::policy::{DecisionOutcome, Verdict};
use crate::AutoFixError;

/// Running in-process counters. Not persisted: everything durable flows
/// through pattern reinforcement in the store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutcomeStats {
    pub total_errors: u64,
    pub auto_fixed: u64,
    pub suggested: u64,
    pub deferred: u64,
    pub successes: u64,
    /// successes / (auto_fixed + suggested). Deferred decisions never had
    /// a remediation attempted, so they are excluded from the denominator.
    pub success_rate: f64,
}

impl OutcomeStats {
    fn recompute_rate(&mut self) {
        let attempted = self.auto_fixed + self.suggested;
        self.success_rate = if attempted == 0 {
            0.0
        } else {
            self.successes as f64 / attempted as f64
        };
    }
}

pub struct OutcomeTracker {
    store: Arc<dyn PatternStore>,
    stats: Mutex<OutcomeStats>,
}

impl OutcomeTracker {
    pub fn new(store: Arc<dyn PatternStore>) -> Self {
        Self {
            store,
            stats: Mutex::new(OutcomeStats::default()),
        }
    }

    /// Counts a freshly made decision. Called by the orchestrator, once
    /// per decision.
    pub fn record_decision(&self, outcome: &DecisionOutcome) {
        let mut stats = self.stats.lock().expect("stats lock poisoned");
        stats.total_errors += 1;
        match outcome.verdict {
            Verdict::AutoFixed => stats.auto_fixed += 1,
            Verdict::Suggested => stats.suggested += 1,
            Verdict::Deferred => stats.deferred += 1,
        }
        stats.recompute_rate();
    }

    /// Reports how a decided remediation actually went.
    ///
    /// Reinforces the chosen pattern in the store and updates the running
    /// success rate. A stale pattern reference (the store no longer has
    /// the id) is logged and swallowed so a late report never fails the
    /// caller; other store failures propagate.
    pub async fn track(
        &self,
        outcome: &DecisionOutcome,
        success: bool,
    ) -> Result<(), AutoFixError> {
        if let Some(pattern) = &outcome.pattern {
            match self.store.reinforce(&pattern.id, success).await {
                Ok(updated) => {
                    metrics::increment_counter!(
                        "auto_fix_reinforcements_total",
                        "result" => if success { "success" } else { "failure" }
                    );
                    tracing::debug!(
                        pattern.id = %updated.id,
                        pattern.confidence = updated.confidence,
                        success,
                        "pattern reinforced"
                    );
                }
                Err(StoreError::PatternNotFound(id)) => {
                    tracing::warn!(pattern.id = %id, "outcome for a pattern the store no longer has");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let mut stats = self.stats.lock().expect("stats lock poisoned");
        if success && outcome.verdict != Verdict::Deferred {
            stats.successes += 1;
        }
        stats.recompute_rate();
        Ok(())
    }

    pub fn snapshot(&self) -> OutcomeStats {
        self.stats.lock().expect("stats lock poisoned").clone()
    }
}
