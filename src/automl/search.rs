//! Search space and random search.
//!
//! # References
//!
//! Bergstra & Bengio (2012). Random Search for Hyper-Parameter Optimization. JMLR.

use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::automl::params::ParamKey;
use crate::error::{FlyError, Result};

/// A continuous dimension over the closed interval `[low, high]`.
///
/// Integer-valued dimensions are searched through this continuous proxy and
/// rounded by the caller before use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HyperParam {
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
}

impl HyperParam {
    /// Create a continuous parameter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` unless `low <= high` and both are finite.
    pub fn continuous(low: f64, high: f64) -> Result<Self> {
        if !(low.is_finite() && high.is_finite()) || low > high {
            return Err(FlyError::invalid(
                "bounds",
                format!("({low}, {high})"),
                "finite with low <= high",
            ));
        }
        Ok(Self { low, high })
    }

    /// Uniform sample from the interval.
    #[must_use]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.denormalize(rng.gen::<f64>())
    }

    /// Map a value to `[0, 1]`. Point intervals map to `0.5`.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        let width = self.high - self.low;
        if width <= 0.0 {
            return 0.5;
        }
        ((value - self.low) / width).clamp(0.0, 1.0)
    }

    /// Map `u ∈ [0, 1]` back into the interval.
    #[must_use]
    pub fn denormalize(&self, u: f64) -> f64 {
        (self.low + u * (self.high - self.low)).clamp(self.low, self.high)
    }
}

/// Type-safe search space.
///
/// # Example
///
/// ```
/// use flyhash::automl::{FlyParam, SearchSpace};
///
/// let space = SearchSpace::new()
///     .add_continuous(FlyParam::KcSize, 300.0, 15000.0)
///     .expect("valid interval")
///     .add_continuous(FlyParam::ProjSize, 2.0, 20.0)
///     .expect("valid interval");
///
/// assert_eq!(space.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SearchSpace<P: ParamKey> {
    params: BTreeMap<P, HyperParam>,
}

impl<P: ParamKey> Default for SearchSpace<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ParamKey> SearchSpace<P> {
    /// Create an empty search space.
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: BTreeMap::new(),
        }
    }

    /// Number of parameters in the space.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if space is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Add a continuous parameter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for an invalid interval.
    pub fn add_continuous(mut self, key: P, low: f64, high: f64) -> Result<Self> {
        self.params.insert(key, HyperParam::continuous(low, high)?);
        Ok(self)
    }

    /// Get parameter definition by key.
    #[must_use]
    pub fn get(&self, key: &P) -> Option<&HyperParam> {
        self.params.get(key)
    }

    /// Iterate over parameter definitions in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&P, &HyperParam)> {
        self.params.iter()
    }

    /// Sample a random configuration.
    #[must_use]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Trial<P> {
        let values = self.params.iter().map(|(k, p)| (*k, p.sample(rng))).collect();
        Trial { values }
    }

    /// `trial` as a `[0, 1]^d` vector in key order.
    ///
    /// Returns `None` if the trial misses a dimension of the space.
    #[must_use]
    pub fn normalize(&self, trial: &Trial<P>) -> Option<Vec<f64>> {
        self.params
            .iter()
            .map(|(k, p)| trial.get(k).map(|v| p.normalize(v)))
            .collect()
    }

    /// Inverse of [`SearchSpace::normalize`].
    #[must_use]
    pub fn denormalize(&self, unit: &[f64]) -> Trial<P> {
        let values = self
            .params
            .iter()
            .zip(unit)
            .map(|((k, p), &u)| (*k, p.denormalize(u)))
            .collect();
        Trial { values }
    }
}

/// A hyperparameter configuration to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial<P: ParamKey> {
    /// Parameter values for this trial.
    pub values: BTreeMap<P, f64>,
}

impl<P: ParamKey> Trial<P> {
    /// Get a parameter value.
    #[must_use]
    pub fn get(&self, key: &P) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Get a parameter rounded to the nearest non-negative integer.
    #[must_use]
    pub fn get_rounded(&self, key: &P) -> Option<usize> {
        self.get(key).map(|v| v.round().max(0.0) as usize)
    }
}

impl<P: ParamKey> fmt::Display for Trial<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{}={v:.4}", k.name()))
            .collect();
        write!(f, "{{{}}}", params.join(", "))
    }
}

/// Result of evaluating a trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult<P: ParamKey> {
    /// The trial configuration.
    pub trial: Trial<P>,
    /// Objective score (higher is better).
    pub score: f64,
}

/// Search strategy for hyperparameter optimization.
pub trait SearchStrategy<P: ParamKey> {
    /// Propose up to `n` configurations to evaluate next.
    fn suggest(&mut self, space: &SearchSpace<P>, n: usize) -> Vec<Trial<P>>;

    /// Register evaluated configurations, from this run or a prior log.
    fn update(&mut self, _results: &[TrialResult<P>]) {}

    /// Number of registered observations.
    fn n_observations(&self) -> usize {
        0
    }
}

/// Random search optimizer.
///
/// # Example
///
/// ```
/// use flyhash::automl::{FlyParam, RandomSearch, SearchSpace, SearchStrategy};
///
/// let space = SearchSpace::new()
///     .add_continuous(FlyParam::KcSize, 300.0, 15000.0)
///     .expect("valid interval");
///
/// let mut search = RandomSearch::new(50).with_seed(42);
/// let trials = search.suggest(&space, 10);
///
/// assert_eq!(trials.len(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct RandomSearch {
    /// Total number of trials to generate.
    pub n_iter: usize,
    rng: StdRng,
    trials_generated: usize,
}

impl RandomSearch {
    /// Create random search with `n_iter` trials.
    #[must_use]
    pub fn new(n_iter: usize) -> Self {
        Self {
            n_iter,
            rng: StdRng::from_entropy(),
            trials_generated: 0,
        }
    }

    /// Set random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Remaining trials to generate.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.n_iter.saturating_sub(self.trials_generated)
    }
}

impl<P: ParamKey> SearchStrategy<P> for RandomSearch {
    fn suggest(&mut self, space: &SearchSpace<P>, n: usize) -> Vec<Trial<P>> {
        let n = n.min(self.remaining());
        let trials: Vec<Trial<P>> = (0..n).map(|_| space.sample(&mut self.rng)).collect();
        self.trials_generated += trials.len();
        trials
    }
}
