use std::path::{Path, PathBuf};

/// Best score seen over a whole search run and the artifact that holds it.
///
/// Owned by the controlling flow and handed to the evaluator by reference.
/// Worker threads never see it; the compare-and-persist step runs after the
/// per-point join.
#[derive(Debug, Clone)]
pub struct SearchState {
    best_score: f64,
    best_artifact: Option<PathBuf>,
}

impl SearchState {
    /// Fresh state; any finite score is an improvement.
    #[must_use]
    pub fn new() -> Self {
        Self {
            best_score: f64::NEG_INFINITY,
            best_artifact: None,
        }
    }

    /// Best aggregate score so far.
    #[must_use]
    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    /// Path of the currently persisted best model, if any.
    #[must_use]
    pub fn best_artifact(&self) -> Option<&Path> {
        self.best_artifact.as_deref()
    }

    /// Whether `score` strictly beats the best so far.
    #[must_use]
    pub fn improves(&self, score: f64) -> bool {
        score > self.best_score
    }

    pub(crate) fn record_best(&mut self, score: f64, artifact: PathBuf) {
        debug_assert!(self.improves(score));
        self.best_score = score;
        self.best_artifact = Some(artifact);
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new()
    }
}
