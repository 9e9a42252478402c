// oracle-kb-rs/src/store.rs
// Persistence layer for the Oracle knowledge base.
//
// Implementation notes:
// - One JSON document per store, loaded into memory at open time and
//   guarded by a tokio RwLock; every mutation rewrites the whole document
//   via write-temp-then-rename so an interrupted write can never truncate
//   the live file.
// - Queries fail open: a store that could not be loaded answers "no
//   matches" rather than blocking the caller. Mutations against such a
//   store are rejected so a later rewrite cannot clobber knowledge that
//   is still on disk.
// - Single-process only. Cross-process writers would need file locking or
//   an embedded database behind the same trait.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;

use crate::model::{
    ErrorCategory, ErrorEvent, ErrorRecord, KnowledgeDocument, PatternMatch, SolutionPattern,
};
use crate::reinforcement;

/// Store error type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("pattern not found: {0}")]
    PatternNotFound(String),

    #[error("knowledge document at {0} could not be parsed; refusing to overwrite it")]
    CorruptDocument(PathBuf),
}

/// Narrow persistence contract for the knowledge base.
///
/// The file-backed implementation below is the default; an embedded
/// database backend can be wired behind this trait later.
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Appends one observed failure to the error history.
    async fn record_error(&self, record: &ErrorRecord) -> Result<(), StoreError>;

    /// Inserts a pattern, or replaces the stored pattern with the same id.
    async fn upsert_pattern(&self, pattern: &SolutionPattern) -> Result<(), StoreError>;

    async fn get_pattern(&self, id: &str) -> Result<Option<SolutionPattern>, StoreError>;

    /// Returns candidate remediations for an error, sorted by descending
    /// confidence.
    ///
    /// A pattern qualifies when its similarity score reaches
    /// `min_similarity`, or when `bypass_on_exact_category` is set and its
    /// `pattern_type` equals the classified category.
    async fn find_matches(
        &self,
        category: ErrorCategory,
        event: &ErrorEvent,
        min_similarity: f64,
        bypass_on_exact_category: bool,
    ) -> Result<Vec<PatternMatch>, StoreError>;

    /// Records which solution was chosen for an error record.
    async fn link_error_to_solution(
        &self,
        error_id: &str,
        solution_id: &str,
    ) -> Result<(), StoreError>;

    /// Applies one observed outcome to a stored pattern and persists the
    /// result. Returns the updated pattern, or
    /// `StoreError::PatternNotFound` if the id is unknown.
    async fn reinforce(&self, pattern_id: &str, success: bool) -> Result<SolutionPattern, StoreError>;
}

/// Similarity heuristic between an incoming error and a stored pattern.
///
/// +0.5 when the category token appears in the pattern's symptom text, or
/// the symptom text itself appears in the error message; +0.3 when any
/// string-valued context entry appears in the error message.
pub fn similarity_score(
    category: ErrorCategory,
    event: &ErrorEvent,
    pattern: &SolutionPattern,
) -> f64 {
    let message = event.message.to_ascii_lowercase();
    let symptom = pattern.symptom.to_ascii_lowercase();
    let token = category.as_token();

    let mut score = 0.0;
    if symptom.contains(token) || (!symptom.is_empty() && message.contains(&symptom)) {
        score += 0.5;
    }

    let keyword_hit = event.context.values().any(|v| {
        v.as_str()
            .map(|s| {
                let s = s.to_ascii_lowercase();
                !s.is_empty() && message.contains(&s)
            })
            .unwrap_or(false)
    });
    if keyword_hit {
        score += 0.3;
    }

    score
}

/// Baseline remediations seeded into every store at startup, so the
/// decision path always flows through one source of truth instead of a
/// separate hardcoded fallback table.
pub fn builtin_patterns() -> Vec<SolutionPattern> {
    vec![
        SolutionPattern::new(
            ErrorCategory::Timeout,
            "operation timeout while waiting on a remote dependency",
            "retry with exponential backoff",
        )
        .with_id("builtin-timeout-retry")
        .with_confidence(1.0)
        .parameter("max_retries", 3)
        .parameter("backoff_factor", 2.0),
        SolutionPattern::new(
            ErrorCategory::Network,
            "network connection refused or dropped",
            "re-establish the connection, then retry once",
        )
        .with_id("builtin-network-reconnect")
        .with_confidence(0.9)
        .parameter("max_retries", 1),
    ]
}

struct StoreState {
    doc: KnowledgeDocument,
    /// Set when the on-disk document existed but could not be parsed.
    /// Reads answer empty; writes are refused.
    degraded: bool,
}

/// File-backed store: the whole knowledge base lives in one JSON document.
pub struct FileBackedPatternStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl FileBackedPatternStore {
    /// Opens (or initializes) a store at the given path.
    ///
    /// A missing file is an empty knowledge base; an unparsable file puts
    /// the store into degraded fail-open mode without touching the bytes
    /// on disk. Uses blocking std::fs since this is a one-time startup
    /// load.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<KnowledgeDocument>(&raw) {
                Ok(doc) => StoreState {
                    doc,
                    degraded: false,
                },
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "knowledge document unparsable; store is degraded (queries answer empty)"
                    );
                    StoreState {
                        doc: KnowledgeDocument::default(),
                        degraded: true,
                    }
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreState {
                doc: KnowledgeDocument::default(),
                degraded: false,
            },
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Opens a store at the path from ORACLE_STORE_PATH, or the default
    /// location under data/.
    pub fn new_default() -> Result<Self, StoreError> {
        let path = std::env::var("ORACLE_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/oracle/knowledge.json"));
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Seeds the built-in patterns. Idempotent: a pattern id that already
    /// exists is left alone so reinforced confidences survive restarts.
    pub async fn seed_builtin_patterns(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.degraded {
            return Err(StoreError::CorruptDocument(self.path.clone()));
        }

        let mut changed = false;
        for pattern in builtin_patterns() {
            if !state.doc.solutions.iter().any(|s| s.id == pattern.id) {
                state.doc.solutions.push(pattern);
                changed = true;
            }
        }

        if changed {
            self.persist(&state.doc).await?;
        }
        Ok(())
    }

    /// Rewrites the whole document atomically: serialize to a sibling temp
    /// file, then rename over the live path.
    async fn persist(&self, doc: &KnowledgeDocument) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        let raw = serde_json::to_vec_pretty(doc)?;
        fs::write(&tmp, &raw).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn mutate<F, T>(&self, apply: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut KnowledgeDocument) -> Result<T, StoreError>,
    {
        let mut state = self.state.write().await;
        if state.degraded {
            return Err(StoreError::CorruptDocument(self.path.clone()));
        }
        let out = apply(&mut state.doc)?;
        self.persist(&state.doc).await?;
        Ok(out)
    }
}

#[async_trait]
impl PatternStore for FileBackedPatternStore {
    async fn record_error(&self, record: &ErrorRecord) -> Result<(), StoreError> {
        let record = record.clone();
        self.mutate(move |doc| {
            doc.errors.push(record);
            Ok(())
        })
        .await
    }

    async fn upsert_pattern(&self, pattern: &SolutionPattern) -> Result<(), StoreError> {
        let pattern = pattern.clone();
        self.mutate(move |doc| {
            match doc.solutions.iter_mut().find(|s| s.id == pattern.id) {
                Some(existing) => *existing = pattern,
                None => doc.solutions.push(pattern),
            }
            Ok(())
        })
        .await
    }

    async fn get_pattern(&self, id: &str) -> Result<Option<SolutionPattern>, StoreError> {
        let state = self.state.read().await;
        Ok(state.doc.solutions.iter().find(|s| s.id == id).cloned())
    }

    async fn find_matches(
        &self,
        category: ErrorCategory,
        event: &ErrorEvent,
        min_similarity: f64,
        bypass_on_exact_category: bool,
    ) -> Result<Vec<PatternMatch>, StoreError> {
        let state = self.state.read().await;
        if state.degraded {
            tracing::warn!(
                path = %self.path.display(),
                "querying degraded knowledge store; answering with no matches"
            );
            return Ok(Vec::new());
        }

        let mut matches: Vec<PatternMatch> = state
            .doc
            .solutions
            .iter()
            .filter_map(|pattern| {
                let similarity = similarity_score(category, event, pattern);
                let exact = pattern.pattern_type == category;
                if similarity >= min_similarity || (bypass_on_exact_category && exact) {
                    Some(PatternMatch {
                        pattern: pattern.clone(),
                        similarity,
                    })
                } else {
                    None
                }
            })
            .collect();

        matches.sort_by(|a, b| {
            b.pattern
                .confidence
                .partial_cmp(&a.pattern.confidence)
                .unwrap_or(Ordering::Equal)
        });

        Ok(matches)
    }

    async fn link_error_to_solution(
        &self,
        error_id: &str,
        solution_id: &str,
    ) -> Result<(), StoreError> {
        let (error_id, solution_id) = (error_id.to_string(), solution_id.to_string());
        self.mutate(move |doc| {
            doc.error_solution_map.insert(error_id, solution_id);
            Ok(())
        })
        .await
    }

    async fn reinforce(&self, pattern_id: &str, success: bool) -> Result<SolutionPattern, StoreError> {
        let pattern_id = pattern_id.to_string();
        self.mutate(move |doc| {
            let pattern = doc
                .solutions
                .iter_mut()
                .find(|s| s.id == pattern_id)
                .ok_or_else(|| StoreError::PatternNotFound(pattern_id.clone()))?;
            reinforcement::reinforce(pattern, success);
            Ok(pattern.clone())
        })
        .await
    }
}
