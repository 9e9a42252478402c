// autofix-rs/src/classifier.rs
// Heuristic error classification for auto-fix decisions.

use serde::{Deserialize, Serialize};

use oracle_kb::model::{ErrorCategory, ErrorEvent};

/// Severity of a classified error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

/// Broad functional area the failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureDomain {
    NetworkReliability,
    ApiError,
    Authentication,
    General,
}

/// Classification output driving the decision policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: ErrorCategory,
    pub domain: FailureDomain,
    pub severity: Severity,
    pub auto_fixable: bool,
}

/// Strategy interface for error classification.
///
/// Implementations may be heuristic-only or backed by something smarter
/// in the future; the orchestrator only depends on this trait.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, event: &ErrorEvent) -> Classification;
}

/// Pure substring classifier. Tests are ordered: the first matching rule
/// wins, and anything unmatched degrades to `unknown`.
#[derive(Debug, Default)]
pub struct HeuristicErrorClassifier;

impl ErrorClassifier for HeuristicErrorClassifier {
    fn classify(&self, event: &ErrorEvent) -> Classification {
        let message = event.message.to_ascii_lowercase();

        if message.contains("timeout") || message.contains("timed out") {
            Classification {
                category: ErrorCategory::Timeout,
                domain: FailureDomain::NetworkReliability,
                severity: Severity::Medium,
                auto_fixable: true,
            }
        } else if message.contains("connection") {
            Classification {
                category: ErrorCategory::Network,
                domain: FailureDomain::NetworkReliability,
                severity: Severity::Medium,
                auto_fixable: true,
            }
        } else if message.contains("http") || message.contains("status") {
            Classification {
                category: ErrorCategory::HttpError,
                domain: FailureDomain::ApiError,
                severity: Severity::High,
                auto_fixable: false,
            }
        } else if message.contains("permission") || message.contains("forbidden") {
            Classification {
                category: ErrorCategory::Permission,
                domain: FailureDomain::Authentication,
                severity: Severity::High,
                auto_fixable: false,
            }
        } else {
            Classification {
                category: ErrorCategory::Unknown,
                domain: FailureDomain::General,
                severity: Severity::Medium,
                auto_fixable: false,
            }
        }
    }
}
