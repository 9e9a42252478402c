// oracle-kb-rs/src/reinforcement.rs
// Confidence reinforcement arithmetic.
//
// Kept as pure functions on the model so the update rule is trivially
// testable; the store applies them under its write lock and persists the
// result.

use chrono::Utc;

use crate::model::SolutionPattern;

/// Confidence gained by one reported success.
pub const SUCCESS_DELTA: f64 = 0.05;

/// Confidence lost by one reported failure.
pub const FAILURE_DELTA: f64 = 0.10;

/// Applies one observed outcome to a pattern: moves confidence by the
/// fixed delta (clamped to [0, 1]) and bumps the usage counters.
pub fn reinforce(pattern: &mut SolutionPattern, success: bool) {
    if success {
        pattern.confidence = (pattern.confidence + SUCCESS_DELTA).min(1.0);
        pattern.usage.record_success();
    } else {
        pattern.confidence = (pattern.confidence - FAILURE_DELTA).max(0.0);
        pattern.usage.record_failure();
    }
    pattern.updated_at = Utc::now();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ErrorCategory;

    fn pattern_with_confidence(confidence: f64) -> SolutionPattern {
        SolutionPattern::new(ErrorCategory::Timeout, "request timeout", "retry with backoff")
            .with_confidence(confidence)
    }

    #[test]
    fn success_adds_fixed_delta() {
        let mut p = pattern_with_confidence(0.5);
        reinforce(&mut p, true);
        assert!((p.confidence - 0.55).abs() < 1e-9);
    }

    #[test]
    fn failure_subtracts_fixed_delta() {
        let mut p = pattern_with_confidence(0.5);
        reinforce(&mut p, false);
        assert!((p.confidence - 0.40).abs() < 1e-9);
    }

    #[test]
    fn confidence_is_capped_at_one() {
        let mut p = pattern_with_confidence(0.98);
        reinforce(&mut p, true);
        assert_eq!(p.confidence, 1.0);
        reinforce(&mut p, true);
        assert_eq!(p.confidence, 1.0);
    }

    #[test]
    fn confidence_is_floored_at_zero() {
        let mut p = pattern_with_confidence(0.05);
        reinforce(&mut p, false);
        assert_eq!(p.confidence, 0.0);
        reinforce(&mut p, false);
        assert_eq!(p.confidence, 0.0);
    }

    #[test]
    fn confidence_stays_in_unit_interval_for_any_start() {
        for start in [0.0, 0.01, 0.1, 0.33, 0.5, 0.79, 0.8, 0.95, 1.0] {
            let mut p = pattern_with_confidence(start);
            reinforce(&mut p, true);
            assert!((0.0..=1.0).contains(&p.confidence), "start={start}");

            let mut p = pattern_with_confidence(start);
            reinforce(&mut p, false);
            assert!((0.0..=1.0).contains(&p.confidence), "start={start}");
        }
    }

    #[test]
    fn two_successes_one_failure_from_half_returns_to_half() {
        let mut p = pattern_with_confidence(0.5);
        reinforce(&mut p, true);
        reinforce(&mut p, true);
        reinforce(&mut p, false);

        assert!((p.confidence - 0.5).abs() < 1e-9);
        assert_eq!(p.usage.attempts(), 3);
        assert_eq!(p.usage.successes(), 2);
        assert_eq!(p.usage.failures(), 1);
        assert!((p.usage.success_rate() - 2.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn attempts_always_equal_successes_plus_failures() {
        let mut p = pattern_with_confidence(0.5);
        for i in 0..20 {
            reinforce(&mut p, i % 3 != 0);
            assert_eq!(p.usage.attempts(), p.usage.successes() + p.usage.failures());
        }
    }
}
