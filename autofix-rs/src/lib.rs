 // autofix-rs/src/lib.rs
 // Library interface for the auto-fix decision layer.
 //
 // Public API is intentionally minimal: callers hand over a failure, get a
 // verdict back, and later report how the remediation went.
 //
 // Design notes:
 // - This crate is a pure library crate; there is no HTTP server or
 //   standalone binary entrypoint.
 // - The decision path is conservative: every failure mode inside the
 //   policy degrades to a Deferred verdict rather than surfacing an error
 //   to the mission path. Outcome reporting is the only operation that can
 //   propagate a store error.

use std::{env, sync::Arc};

use tracing::instrument;

pub mod classifier;
pub mod policy;
pub mod tracker;


use oracle_kb::model::{ErrorEvent, ErrorRecord, FailureReport};
use oracle_kb::store::{FileBackedPatternStore, PatternStore, StoreError};

use crate::classifier::{ErrorClassifier, HeuristicErrorClassifier};
use crate::policy::{DecisionOutcome, PolicyConfig};
use crate::tracker::{OutcomeStats, OutcomeTracker};

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, AutoFixError>;

/// Top-level error type for this crate.
#[derive(Debug, thiserror::Error)]
pub enum AutoFixError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration flags for the auto-fix layer.
#[derive(Debug, Clone)]
pub struct AutoFixConfig {
    /// Enable decision making. When false, every decision defers and the
    /// store is never touched.
    pub enabled: bool,
    pub policy: PolicyConfig,
}

impl Default for AutoFixConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: PolicyConfig::default(),
        }
    }
}

impl AutoFixConfig {
    /// Construct configuration from environment variables.
    ///
    /// This helper is intentionally conservative and never panics:
    /// - AUTO_FIX_ENABLED: "1", "true", "yes", "on" (case-insensitive);
    ///   anything else (including unset) disables the layer.
    /// - AUTO_FIX_CONFIDENCE_THRESHOLD: see PolicyConfig::from_env.
    pub fn from_env() -> Self {
        fn parse_bool_var(name: &str) -> bool {
            match env::var(name) {
                Ok(val) => {
                    let v = val.trim().to_ascii_lowercase();
                    matches!(v.as_str(), "1" | "true" | "yes" | "on")
                }
                Err(_) => false,
            }
        }

        Self {
            enabled: parse_bool_var("AUTO_FIX_ENABLED"),
            policy: PolicyConfig::from_env(),
        }
    }
}

/// Core decision engine.
///
/// Typical usage (inside an async context):
///
/// ```ignore
/// let orchestrator = AutoFixOrchestrator::new(AutoFixConfig::default()).await?;
///
/// let outcome = orchestrator.decide(&event).await?;
/// // ... caller retries (or asks the user) based on outcome.verdict ...
/// orchestrator.report_outcome(&outcome, retried_ok).await?;
/// ```
pub struct AutoFixOrchestrator {
    cfg: AutoFixConfig,
    store: Arc<dyn PatternStore>,
    classifier: Arc<dyn ErrorClassifier>,
    tracker: OutcomeTracker,
}

impl AutoFixOrchestrator {
    /// Construct an orchestrator with the default file-backed store
    /// (ORACLE_STORE_PATH or data/oracle/knowledge.json) and the heuristic
    /// classifier. Seeds the built-in remediation patterns when enabled.
    pub async fn new(cfg: AutoFixConfig) -> Result<Self> {
        let store = FileBackedPatternStore::new_default()?;
        if cfg.enabled {
            store.seed_builtin_patterns().await?;
        }
        Ok(Self::with_store(cfg, Arc::new(store)))
    }

    /// Construct an orchestrator over an existing store. The store is used
    /// as-is; callers that want the built-in patterns seed it themselves.
    pub fn with_store(cfg: AutoFixConfig, store: Arc<dyn PatternStore>) -> Self {
        let tracker = OutcomeTracker::new(store.clone());
        Self {
            cfg,
            store,
            classifier: Arc::new(HeuristicErrorClassifier),
            tracker,
        }
    }

    /// Decide how to handle one failure using the configured threshold.
    pub async fn decide(&self, event: &ErrorEvent) -> Result<DecisionOutcome> {
        self.decide_with_threshold(event, self.cfg.policy.auto_fix_threshold)
            .await
    }

    /// Decide how to handle one failure, overriding the auto-fix
    /// threshold for this call only.
    ///
    /// The flow: classify, persist the observation, query the store for
    /// matching remediations, route the best match through the threshold
    /// table. Persistence problems are logged and never change the
    /// verdict; an unreachable store simply means "no stored knowledge"
    /// and the decision defers.
    #[instrument(
        name = "auto_fix_decision",
        skip(self, event),
        fields(error.message = %event.message)
    )]
    pub async fn decide_with_threshold(
        &self,
        event: &ErrorEvent,
        auto_fix_threshold: f64,
    ) -> Result<DecisionOutcome> {
        let classification = self.classifier.classify(event);

        if !self.cfg.enabled {
            tracing::debug!("auto-fix disabled; deferring without consulting the store");
            return Ok(policy::route(
                classification.category,
                None,
                auto_fix_threshold,
                self.cfg.policy.suggest_threshold,
            ));
        }

        let record = ErrorRecord::from_event(event, classification.category);
        if let Err(err) = self.store.record_error(&record).await {
            tracing::warn!(error = %err, "failed to persist error record; continuing");
        }

        let matches = match self
            .store
            .find_matches(
                classification.category,
                event,
                self.cfg.policy.min_similarity,
                self.cfg.policy.bypass_similarity_on_exact_category_match,
            )
            .await
        {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!(error = %err, "pattern store unavailable; deciding without stored knowledge");
                Vec::new()
            }
        };

        let outcome = policy::route(
            classification.category,
            matches.first(),
            auto_fix_threshold,
            self.cfg.policy.suggest_threshold,
        );

        if let Some(pattern) = &outcome.pattern {
            if let Err(err) = self.store.link_error_to_solution(&record.id, &pattern.id).await {
                tracing::warn!(error = %err, "failed to link error to solution; continuing");
            }
        }

        self.tracker.record_decision(&outcome);
        metrics::increment_counter!(
            "auto_fix_decisions_total",
            "verdict" => outcome.verdict.as_str(),
            "category" => classification.category.as_token()
        );
        tracing::info!(
            verdict = %outcome.verdict,
            category = %outcome.category,
            confidence = outcome.confidence,
            retry_recommended = outcome.retry_recommended,
            "auto-fix decision made"
        );

        Ok(outcome)
    }

    /// Convenience entry point for the caller-facing failure object.
    ///
    /// A successful report, or one with no errors, yields no decision.
    /// Otherwise the first error drives the verdict.
    pub async fn decide_report(&self, report: &FailureReport) -> Result<Option<DecisionOutcome>> {
        if report.success {
            return Ok(None);
        }
        match report.first_error() {
            Some(event) => Ok(Some(self.decide(event).await?)),
            None => Ok(None),
        }
    }

    /// Reports how the remediation for a decision actually went. Feeds
    /// reinforcement and the running statistics.
    pub async fn report_outcome(&self, outcome: &DecisionOutcome, success: bool) -> Result<()> {
        self.tracker.track(outcome, success).await
    }

    /// Snapshot of the running decision statistics.
    pub fn stats(&self) -> OutcomeStats {
        self.tracker.snapshot()
    }
}
