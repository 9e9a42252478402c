// oracle-kb-rs/src/model.rs
// Persisted data model for the Oracle knowledge base.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Version of the on-disk knowledge document schema.
pub const SCHEMA_VERSION: u32 = 1;

/// Coarse error category derived from a failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Timeout,
    Network,
    HttpError,
    Permission,
    Unknown,
}

impl ErrorCategory {
    /// Stable lowercase token used for similarity matching and metric labels.
    pub fn as_token(&self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Network => "network",
            ErrorCategory::HttpError => "http_error",
            ErrorCategory::Permission => "permission",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// One failure as reported by the surrounding mission-execution code.
///
/// This struct is designed to be easy to construct from existing failure
/// paths without pulling in concrete caller types; `context` is an opaque
/// key/value bag the caller controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub observed_at: DateTime<Utc>,
    pub mission_type: Option<String>,
}

impl ErrorEvent {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            context: Map::new(),
            observed_at: Utc::now(),
            mission_type: None,
        }
    }

    /// Adds a context entry, builder-style.
    pub fn context<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Serialize,
    {
        if let Ok(value) = serde_json::to_value(value) {
            self.context.insert(key.into(), value);
        }
        self
    }

    pub fn mission_type<S: Into<String>>(mut self, mission_type: S) -> Self {
        self.mission_type = Some(mission_type.into());
        self
    }
}

/// The failure object external callers hand to the decision layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ErrorEvent>,
    pub mission_type: Option<String>,
}

impl FailureReport {
    /// Convenience constructor for a failed mission with one error.
    pub fn failed(error: ErrorEvent) -> Self {
        Self {
            success: false,
            errors: vec![error],
            mission_type: None,
        }
    }

    pub fn first_error(&self) -> Option<&ErrorEvent> {
        self.errors.first()
    }
}

/// Persisted representation of one observed failure. Append-only; records
/// are never mutated or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: String,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub observed_at: DateTime<Utc>,
}

impl ErrorRecord {
    /// Derive a persisted record from a caller event and its classified
    /// category.
    pub fn from_event(event: &ErrorEvent, category: ErrorCategory) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category,
            message: event.message.clone(),
            context: event.context.clone(),
            observed_at: event.observed_at,
        }
    }
}

/// Monotonically increasing outcome counters for one solution pattern.
///
/// Fields are private so the `attempts == successes + failures` invariant
/// holds by construction; counters only move through the record_* methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    attempts: u64,
    successes: u64,
    failures: u64,
    success_rate: f64,
}

impl UsageStats {
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    pub(crate) fn record_success(&mut self) {
        self.attempts += 1;
        self.successes += 1;
        self.recompute_rate();
    }

    pub(crate) fn record_failure(&mut self) {
        self.attempts += 1;
        self.failures += 1;
        self.recompute_rate();
    }

    fn recompute_rate(&mut self) {
        self.success_rate = if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        };
    }
}

/// One remediation strategy tied to an error category, with a confidence
/// score that reinforcement moves up and down over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionPattern {
    pub id: String,
    pub pattern_type: ErrorCategory,
    /// Free-text description of the symptom this pattern remediates; used
    /// by similarity matching against incoming error messages.
    pub symptom: String,
    /// Free-text description of the remediation technique.
    pub technique: String,
    /// Opaque remediation parameters (retry counts, backoff factors, ...).
    #[serde(default)]
    pub parameters: Map<String, Value>,
    pub confidence: f64,
    #[serde(default)]
    pub usage: UsageStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SolutionPattern {
    pub fn new<S: Into<String>, T: Into<String>>(
        pattern_type: ErrorCategory,
        symptom: S,
        technique: T,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            pattern_type,
            symptom: symptom.into(),
            technique: technique.into(),
            parameters: Map::new(),
            confidence: 0.5,
            usage: UsageStats::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overrides the generated id. Used for the built-in seed patterns,
    /// which need stable ids across restarts.
    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the initial confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn parameter<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Serialize,
    {
        if let Ok(value) = serde_json::to_value(value) {
            self.parameters.insert(key.into(), value);
        }
        self
    }
}

/// The whole persisted store: one JSON document, read into memory at open
/// and rewritten wholesale (atomically) on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub schema_version: u32,
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
    #[serde(default)]
    pub solutions: Vec<SolutionPattern>,
    /// error-record id -> solution-pattern id, recorded at decision time.
    #[serde(default)]
    pub error_solution_map: HashMap<String, String>,
}

impl Default for KnowledgeDocument {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            errors: Vec::new(),
            solutions: Vec::new(),
            error_solution_map: HashMap::new(),
        }
    }
}

/// One candidate remediation returned by a store query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: SolutionPattern,
    pub similarity: f64,
}
