//! Tree-structured Parzen Estimator (TPE) optimizer.
//!
//! TPE is a sequential model-based optimization algorithm that models
//! p(x|y) instead of p(y|x), making it more efficient than random search.
//!
//! # Algorithm
//!
//! 1. Split observations into "good" (l) and "bad" (g) based on gamma quantile
//! 2. Fit Kernel Density Estimators to each group
//! 3. Sample candidates and select by Expected Improvement ratio: l(x) / g(x)
//!
//! Observations are kept in parameter space and normalized against the
//! search-space bounds at suggestion time, so points loaded from a prior log
//! and points observed in this run share one scale.
//!
//! # References
//!
//! Bergstra et al. (2011). Algorithms for Hyper-Parameter Optimization. `NeurIPS`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::automl::params::ParamKey;
use crate::automl::search::{SearchSpace, SearchStrategy, Trial, TrialResult};

/// TPE optimizer configuration.
#[derive(Debug, Clone)]
pub struct TPEConfig {
    /// Quantile for splitting good/bad observations (default: 0.25)
    pub gamma: f64,
    /// Number of candidates to sample per iteration (default: 24)
    pub n_candidates: usize,
    /// Minimum observations before using the model (default: 10)
    pub n_startup_trials: usize,
}

impl Default for TPEConfig {
    fn default() -> Self {
        Self {
            gamma: 0.25,
            n_candidates: 24,
            n_startup_trials: 10,
        }
    }
}

/// Tree-structured Parzen Estimator optimizer.
///
/// Falls back to uniform sampling until `n_startup_trials` observations are
/// registered.
///
/// # Example
///
/// ```
/// use flyhash::automl::{FlyParam, SearchSpace, SearchStrategy, TPE};
///
/// let space = SearchSpace::new()
///     .add_continuous(FlyParam::KcSize, 300.0, 15000.0)
///     .expect("valid interval");
///
/// let mut tpe = TPE::new(100).with_seed(7);
/// let trials = tpe.suggest(&space, 1);
/// assert_eq!(trials.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct TPE<P: ParamKey> {
    config: TPEConfig,
    n_trials: usize,
    history: Vec<TrialResult<P>>,
    trials_suggested: usize,
    rng: StdRng,
}

impl<P: ParamKey> TPE<P> {
    /// Create TPE optimizer proposing at most `n_trials` points.
    #[must_use]
    pub fn new(n_trials: usize) -> Self {
        Self {
            config: TPEConfig::default(),
            n_trials,
            history: Vec::new(),
            trials_suggested: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Set random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Set gamma (quantile for good/bad split).
    #[must_use]
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.config.gamma = gamma.clamp(0.01, 0.5);
        self
    }

    /// Set number of candidates scored per proposal.
    #[must_use]
    pub fn with_candidates(mut self, n: usize) -> Self {
        self.config.n_candidates = n.max(1);
        self
    }

    /// Set number of startup trials (random before model).
    #[must_use]
    pub fn with_startup_trials(mut self, n: usize) -> Self {
        self.config.n_startup_trials = n;
        self
    }

    /// Remaining trials.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.n_trials.saturating_sub(self.trials_suggested)
    }

    /// Registered observations, in registration order.
    #[must_use]
    pub fn history(&self) -> &[TrialResult<P>] {
        &self.history
    }

    /// Best registered observation.
    #[must_use]
    pub fn best(&self) -> Option<&TrialResult<P>> {
        self.history
            .iter()
            .filter(|r| !r.score.is_nan())
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }

    fn should_use_model(&self) -> bool {
        self.history.len() >= self.config.n_startup_trials.max(2)
    }

    /// Compute Gaussian KDE density at a point.
    fn kde_density(samples: &[f64], point: f64, bandwidth: f64) -> f64 {
        if samples.is_empty() {
            return 1.0; // Uniform prior
        }

        let n = samples.len() as f64;
        let sum: f64 = samples
            .iter()
            .map(|&x| {
                let z = (point - x) / bandwidth;
                (-0.5 * z * z).exp()
            })
            .sum();

        let norm = (2.0 * std::f64::consts::PI).sqrt() * bandwidth * n;
        sum / norm
    }

    /// Scott's rule: h = n^(-1/5) * std
    fn compute_bandwidth(samples: &[f64]) -> f64 {
        if samples.len() < 2 {
            return 1.0;
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt().max(0.01);

        std * n.powf(-0.2)
    }

    /// Split normalized observations into good and bad by the gamma quantile.
    fn split_observations(&self, space: &SearchSpace<P>) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let mut scored: Vec<(f64, Vec<f64>)> = self
            .history
            .iter()
            .filter_map(|r| space.normalize(&r.trial).map(|x| (r.score, x)))
            .collect();
        if scored.len() < 2 {
            return (scored.into_iter().map(|(_, x)| x).collect(), Vec::new());
        }

        // descending; NaN scores sort last
        scored.sort_by(|a, b| match (a.0.is_nan(), b.0.is_nan()) {
            (false, false) => b.0.total_cmp(&a.0),
            (nan_a, nan_b) => nan_a.cmp(&nan_b),
        });

        let n_good = ((scored.len() as f64) * self.config.gamma).ceil() as usize;
        let n_good = n_good.clamp(1, scored.len() - 1);

        let bad = scored.split_off(n_good);
        (
            scored.into_iter().map(|(_, x)| x).collect(),
            bad.into_iter().map(|(_, x)| x).collect(),
        )
    }

    /// Expected Improvement ratio l(x) / g(x) for a candidate.
    fn compute_ei_ratio(candidate: &[f64], good: &[Vec<f64>], bad: &[Vec<f64>]) -> f64 {
        if candidate.is_empty() {
            return 0.0;
        }

        let density = |group: &[Vec<f64>]| {
            candidate
                .iter()
                .enumerate()
                .map(|(dim, &x)| {
                    let samples: Vec<f64> = group.iter().map(|o| o[dim]).collect();
                    Self::kde_density(&samples, x, Self::compute_bandwidth(&samples))
                })
                .product::<f64>()
        };

        density(good) / (density(bad) + 1e-10)
    }

    fn sample_candidate(n_dims: usize, rng: &mut StdRng) -> Vec<f64> {
        (0..n_dims).map(|_| rng.gen::<f64>()).collect()
    }
}

impl<P: ParamKey> SearchStrategy<P> for TPE<P> {
    fn suggest(&mut self, space: &SearchSpace<P>, n: usize) -> Vec<Trial<P>> {
        let n = n.min(self.remaining());
        if n == 0 {
            return Vec::new();
        }

        let n_dims = space.len();
        let trials: Vec<Trial<P>> = if !self.should_use_model() || n_dims == 0 {
            (0..n).map(|_| space.sample(&mut self.rng)).collect()
        } else {
            let (good, bad) = self.split_observations(space);

            (0..n)
                .map(|_| {
                    let mut best_candidate = Self::sample_candidate(n_dims, &mut self.rng);
                    let mut best_ei = Self::compute_ei_ratio(&best_candidate, &good, &bad);

                    for _ in 1..self.config.n_candidates {
                        let candidate = Self::sample_candidate(n_dims, &mut self.rng);
                        let ei = Self::compute_ei_ratio(&candidate, &good, &bad);

                        if ei > best_ei {
                            best_ei = ei;
                            best_candidate = candidate;
                        }
                    }

                    space.denormalize(&best_candidate)
                })
                .collect()
        };

        self.trials_suggested += trials.len();
        trials
    }

    fn update(&mut self, results: &[TrialResult<P>]) {
        self.history.extend_from_slice(results);
    }

    fn n_observations(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
#[path = "tpe_tests.rs"]
mod tests;
