// autofix-rs/src/policy.rs
// Threshold table and routing for auto-fix decisions.

use std::env;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use oracle_kb::model::{ErrorCategory, PatternMatch, SolutionPattern};

/// Confidence at or above which a remediation is applied without asking.
pub const CONFIDENCE_AUTO_FIX: f64 = 0.80;

/// Confidence at or above which a remediation is suggested to the user.
pub const CONFIDENCE_SUGGEST: f64 = 0.50;

/// Minimum similarity for a stored pattern to qualify as a match.
pub const SIMILARITY_THRESHOLD: f64 = 0.80;

/// Tunable policy knobs. Defaults reproduce the fixed threshold table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub auto_fix_threshold: f64,
    pub suggest_threshold: f64,
    pub min_similarity: f64,
    /// When set, a pattern whose `pattern_type` equals the classified
    /// category qualifies even below `min_similarity`.
    pub bypass_similarity_on_exact_category_match: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            auto_fix_threshold: CONFIDENCE_AUTO_FIX,
            suggest_threshold: CONFIDENCE_SUGGEST,
            min_similarity: SIMILARITY_THRESHOLD,
            bypass_similarity_on_exact_category_match: true,
        }
    }
}

impl PolicyConfig {
    /// Applies environment overrides on top of the defaults.
    ///
    /// Only the auto-fix threshold is runtime-tunable
    /// (AUTO_FIX_CONFIDENCE_THRESHOLD, a float in [0, 1]); invalid or
    /// out-of-range values are ignored rather than erroring.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(raw) = env::var("AUTO_FIX_CONFIDENCE_THRESHOLD") {
            match raw.trim().parse::<f64>() {
                Ok(v) if (0.0..=1.0).contains(&v) => cfg.auto_fix_threshold = v,
                _ => tracing::warn!(
                    value = %raw,
                    "ignoring invalid AUTO_FIX_CONFIDENCE_THRESHOLD"
                ),
            }
        }
        cfg
    }
}

/// Terminal state of one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    AutoFixed,
    Suggested,
    Deferred,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::AutoFixed => "auto_fixed",
            Verdict::Suggested => "suggested",
            Verdict::Deferred => "deferred",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome handed back to the caller. Ephemeral: not persisted as its
/// own entity, though the chosen pattern link is recorded in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub verdict: Verdict,
    pub category: ErrorCategory,
    pub pattern: Option<SolutionPattern>,
    /// Confidence of the chosen pattern; 0.0 when nothing matched.
    pub confidence: f64,
    /// Similarity of the chosen pattern; 0.0 when nothing matched.
    pub similarity: f64,
    pub retry_recommended: bool,
    pub decided_at: DateTime<Utc>,
}

/// Routes the best store match through the threshold table.
///
/// Boundary semantics are inclusive: confidence exactly at a threshold
/// takes the stronger branch.
pub fn route(
    category: ErrorCategory,
    best: Option<&PatternMatch>,
    auto_fix_threshold: f64,
    suggest_threshold: f64,
) -> DecisionOutcome {
    let decided_at = Utc::now();

    let Some(m) = best else {
        return DecisionOutcome {
            verdict: Verdict::Deferred,
            category,
            pattern: None,
            confidence: 0.0,
            similarity: 0.0,
            retry_recommended: false,
            decided_at,
        };
    };

    let confidence = m.pattern.confidence;
    let verdict = if confidence >= auto_fix_threshold {
        Verdict::AutoFixed
    } else if confidence >= suggest_threshold {
        Verdict::Suggested
    } else {
        Verdict::Deferred
    };

    DecisionOutcome {
        verdict,
        category,
        pattern: Some(m.pattern.clone()),
        confidence,
        similarity: m.similarity,
        retry_recommended: verdict == Verdict::AutoFixed,
        decided_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_with_confidence(confidence: f64) -> PatternMatch {
        let pattern = SolutionPattern::new(ErrorCategory::Timeout, "timeout", "retry")
            .with_confidence(confidence);
        PatternMatch {
            pattern,
            similarity: 0.9,
        }
    }

    fn verdict_for(confidence: f64) -> Verdict {
        let m = match_with_confidence(confidence);
        route(
            ErrorCategory::Timeout,
            Some(&m),
            CONFIDENCE_AUTO_FIX,
            CONFIDENCE_SUGGEST,
        )
        .verdict
    }

    #[test]
    fn confidence_at_auto_fix_boundary_auto_fixes() {
        assert_eq!(verdict_for(0.80), Verdict::AutoFixed);
    }

    #[test]
    fn confidence_at_suggest_boundary_suggests() {
        assert_eq!(verdict_for(0.50), Verdict::Suggested);
    }

    #[test]
    fn confidence_just_below_suggest_defers() {
        assert_eq!(verdict_for(0.49), Verdict::Deferred);
    }

    #[test]
    fn high_confidence_match_auto_fixes_and_recommends_retry() {
        let m = match_with_confidence(0.95);
        let outcome = route(ErrorCategory::Timeout, Some(&m), 0.80, 0.50);
        assert_eq!(outcome.verdict, Verdict::AutoFixed);
        assert!(outcome.retry_recommended);
        assert!((outcome.confidence - 0.95).abs() < 1e-9);
        assert!((outcome.similarity - 0.9).abs() < 1e-9);
    }

    #[test]
    fn mid_confidence_suggests_without_retry() {
        let m = match_with_confidence(0.65);
        let outcome = route(ErrorCategory::Timeout, Some(&m), 0.80, 0.50);
        assert_eq!(outcome.verdict, Verdict::Suggested);
        assert!(!outcome.retry_recommended);
    }

    #[test]
    fn no_match_defers() {
        let outcome = route(ErrorCategory::Unknown, None, 0.80, 0.50);
        assert_eq!(outcome.verdict, Verdict::Deferred);
        assert!(outcome.pattern.is_none());
        assert_eq!(outcome.confidence, 0.0);
        assert!(!outcome.retry_recommended);
    }

    #[test]
    fn threshold_override_is_respected() {
        let m = match_with_confidence(0.70);
        let outcome = route(ErrorCategory::Timeout, Some(&m), 0.70, 0.50);
        assert_eq!(outcome.verdict, Verdict::AutoFixed);
    }
}
