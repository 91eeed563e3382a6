/// Statistics over the fly scores of one hyperparameter point.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSummary {
    /// Scores in fly order.
    pub scores: Vec<f64>,
    /// Mean score; the objective handed back to the optimizer.
    pub avg: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Index of the first maximal score.
    pub best_idx: usize,
}

impl TrialSummary {
    /// The maximal score.
    #[must_use]
    pub fn best_score(&self) -> f64 {
        self.scores[self.best_idx]
    }
}

/// Mean, population std and first argmax of `scores`.
///
/// Returns `None` for an empty slice.
///
/// ```
/// use flyhash::trial::aggregate;
///
/// let summary = aggregate(&[0.70, 0.75, 0.72]).expect("non-empty");
/// assert_eq!(summary.best_idx, 1);
/// assert!((summary.avg - 0.723_333).abs() < 1e-6);
/// ```
#[must_use]
pub fn aggregate(scores: &[f64]) -> Option<TrialSummary> {
    if scores.is_empty() {
        return None;
    }
    let n = scores.len() as f64;
    let avg = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / n;

    let mut best_idx = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best_idx] {
            best_idx = i;
        }
    }

    Some(TrialSummary {
        scores: scores.to_vec(),
        avg,
        std: variance.sqrt(),
        best_idx,
    })
}
