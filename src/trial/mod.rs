//! Evaluation of one hyperparameter point.
//!
//! A point is scored by building `num_trials` independent [`Fly`] instances,
//! hashing both dataset splits with each, training a classifier per fly and
//! averaging the validation scores. Flies run on a bounded rayon pool; the
//! best-of-point comparison against [`SearchState`], artifact replacement and
//! the results-log append happen afterwards on the calling thread.

mod aggregate;
mod artifact;
mod results_log;
mod state;

pub use aggregate::{aggregate, TrialSummary};
pub use artifact::BestArtifactStore;
pub use results_log::ResultsLog;
pub use state::SearchState;

use crate::classification::Classifier;
use crate::config::{RunPaths, SearchConfig};
use crate::data::DatasetSplits;
use crate::encode::Encoder;
use crate::error::{FlyError, Result};
use crate::fly::{wta_percent, Fly};
use crate::projection::ProjectionStrategy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One concrete configuration to evaluate.
///
/// The discrete fields are already rounded; `num_nonzero`, `num_iter` and
/// `num_trials` are fixed for a whole search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterPoint {
    /// Words kept per document before projection.
    pub top_word: usize,
    /// Number of hidden units.
    pub kc_size: usize,
    /// Inputs per hidden unit.
    pub proj_size: usize,
    /// Inverse regularisation strength.
    pub c: f64,
    /// Winners kept by winner-take-all.
    pub num_nonzero: usize,
    /// Classifier iteration budget.
    pub num_iter: usize,
    /// Flies per point.
    pub num_trials: usize,
}

impl HyperparameterPoint {
    /// Winner-take-all percentage for this point.
    #[must_use]
    pub fn wta_percent(&self) -> f64 {
        wta_percent(self.num_nonzero, self.kc_size)
    }

    /// Artifact file stem embedding every hyperparameter and the score.
    ///
    /// ```
    /// use flyhash::trial::HyperparameterPoint;
    ///
    /// let point = HyperparameterPoint {
    ///     top_word: 400, kc_size: 1000, proj_size: 4, c: 1.05,
    ///     num_nonzero: 300, num_iter: 2000, num_trials: 3,
    /// };
    /// assert_eq!(
    ///     point.artifact_stem(0.75),
    ///     "kc1000_proj4_top400_nonzero300_C1.05_iter2000_score75"
    /// );
    /// ```
    #[must_use]
    pub fn artifact_stem(&self, score: f64) -> String {
        format!(
            "kc{}_proj{}_top{}_nonzero{}_C{}_iter{}_score{}",
            self.kc_size,
            self.proj_size,
            self.top_word,
            self.num_nonzero,
            self.c,
            self.num_iter,
            score_digits(score)
        )
    }

    fn validate(&self) -> Result<()> {
        if self.num_trials == 0 {
            return Err(FlyError::invalid("num_trials", 0, "> 0"));
        }
        if self.top_word == 0 {
            return Err(FlyError::invalid("top_word", 0, "> 0"));
        }
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(FlyError::invalid("C", self.c, "finite and > 0"));
        }
        Ok(())
    }
}

/// `0.7512` → `7512`; scores without a leading `0.` just lose the point.
fn score_digits(score: f64) -> String {
    let text = score.to_string();
    match text.strip_prefix("0.") {
        Some(digits) => digits.to_string(),
        None => text.replace('.', ""),
    }
}

/// What came out of evaluating one point.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    /// Score statistics over the flies that completed.
    pub summary: TrialSummary,
    /// The evaluated flies, in the order their scores appear in `summary`.
    pub flies: Vec<Fly>,
    /// Number of flies excluded after failing (isolation mode only).
    pub failed: usize,
    /// Whether this point replaced the best artifact.
    pub improved: bool,
}

/// Scores hyperparameter points on fixed dataset splits.
pub struct TrialEvaluator<E: Encoder, C: Classifier> {
    splits: DatasetSplits,
    encoder: E,
    classifier: C,
    strategy: ProjectionStrategy,
    pool: rayon::ThreadPool,
    rng: StdRng,
    isolate_failures: bool,
    results_log: ResultsLog,
    artifacts: BestArtifactStore,
}

impl<E: Encoder, C: Classifier> TrialEvaluator<E, C> {
    /// Create an evaluator running at most `workers` flies at once.
    ///
    /// # Errors
    ///
    /// Returns `ThreadPool` if the worker pool cannot be built.
    pub fn new(
        splits: DatasetSplits,
        encoder: E,
        classifier: C,
        results_log: ResultsLog,
        artifacts: BestArtifactStore,
        workers: usize,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("fly-worker-{i}"))
            .build()?;
        Ok(Self {
            splits,
            encoder,
            classifier,
            strategy: ProjectionStrategy::default(),
            pool,
            rng: StdRng::from_entropy(),
            isolate_failures: false,
            results_log,
            artifacts,
        })
    }

    /// Create an evaluator writing to the locations in `paths`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the log or artifact directory cannot be prepared and
    /// `ThreadPool` if the pool cannot be built.
    pub fn from_config(
        config: &SearchConfig,
        paths: &RunPaths,
        splits: DatasetSplits,
        encoder: E,
        classifier: C,
    ) -> Result<Self> {
        let results_log = ResultsLog::open(&paths.results_log)?;
        let artifacts = BestArtifactStore::new(&paths.model_dir)?;
        let mut evaluator = Self::new(
            splits,
            encoder,
            classifier,
            results_log,
            artifacts,
            config.worker_count(),
        )?
        .with_strategy(config.projection_strategy)
        .with_failure_isolation(config.isolate_trial_failures);
        if let Some(seed) = config.seed {
            evaluator = evaluator.with_seed(seed);
        }
        Ok(evaluator)
    }

    /// Set the projection strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ProjectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Seed the fly generator.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Exclude failing flies instead of failing the whole point.
    #[must_use]
    pub fn with_failure_isolation(mut self, isolate: bool) -> Self {
        self.isolate_failures = isolate;
        self
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// The dataset splits being scored on.
    #[must_use]
    pub fn splits(&self) -> &DatasetSplits {
        &self.splits
    }

    /// The results log.
    #[must_use]
    pub fn results_log(&self) -> &ResultsLog {
        &self.results_log
    }

    /// The best-artifact store.
    #[must_use]
    pub fn artifacts(&self) -> &BestArtifactStore {
        &self.artifacts
    }

    /// Evaluate `point` and return the outcome.
    ///
    /// The mean validation score is the objective. When the best fly of this
    /// point strictly beats `state`, its model replaces the stored artifact.
    /// One results-log row is appended per call.
    ///
    /// # Errors
    ///
    /// Returns the first fly error unless failure isolation is on, in which
    /// case only `AllTrialsFailed` is returned. Log and artifact I/O errors
    /// are always returned.
    pub fn evaluate(
        &mut self,
        point: &HyperparameterPoint,
        state: &mut SearchState,
    ) -> Result<TrialOutcome> {
        point.validate()?;
        info!(
            kc_size = point.kc_size,
            proj_size = point.proj_size,
            top_word = point.top_word,
            wta = point.wta_percent(),
            c = point.c,
            num_iter = point.num_iter,
            "evaluating point"
        );

        let seeds: Vec<u64> = (0..point.num_trials).map(|_| self.rng.gen()).collect();
        let mut flies = seeds
            .iter()
            .map(|&seed| {
                Fly::new(
                    self.splits.pn_size,
                    point.kc_size,
                    point.proj_size,
                    point.num_nonzero,
                    self.strategy,
                    &mut StdRng::seed_from_u64(seed),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let results: Vec<Result<(f64, C::Model)>> = self.pool.install(|| {
            flies
                .par_iter()
                .enumerate()
                .map(|(i, fly)| self.score_fly(i, fly, point))
                .collect()
        });

        let mut scores = Vec::with_capacity(flies.len());
        let mut models = Vec::with_capacity(flies.len());
        let mut first_error = None;
        let mut failed = 0;
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok((score, model)) => {
                    flies[i].mark_evaluated();
                    scores.push(score);
                    models.push(model);
                }
                Err(e) if self.isolate_failures => {
                    warn!(fly = i, error = %e, "fly failed, excluded from aggregation");
                    failed += 1;
                    first_error.get_or_insert_with(|| e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        let Some(summary) = aggregate(&scores) else {
            return Err(FlyError::AllTrialsFailed {
                trials: point.num_trials,
                first: first_error.unwrap_or_default(),
            });
        };

        let best_score = summary.best_score();
        let improved = state.improves(best_score);
        if improved {
            let model = models.swap_remove(summary.best_idx);
            let path = self
                .artifacts
                .replace(&point.artifact_stem(best_score), &model)?;
            info!(
                score = best_score,
                previous = state.best_score(),
                path = %path.display(),
                "new best model"
            );
            state.record_best(best_score, path);
        }

        self.results_log.append(point, &summary)?;
        info!(avg = summary.avg, std = summary.std, "point evaluated");

        flies.retain(Fly::is_evaluated);

        Ok(TrialOutcome {
            summary,
            flies,
            failed,
            improved,
        })
    }

    fn score_fly(
        &self,
        index: usize,
        fly: &Fly,
        point: &HyperparameterPoint,
    ) -> Result<(f64, C::Model)> {
        let projection = fly.projection();
        let train = self.encoder.encode(
            &self.splits.train.features,
            projection,
            fly.wta_percent(),
            point.top_word,
        )?;
        let val = self.encoder.encode(
            &self.splits.val.features,
            projection,
            fly.wta_percent(),
            point.top_word,
        )?;
        let (score, model) = self.classifier.train(
            &train,
            &self.splits.train.labels,
            &val,
            &self.splits.val.labels,
            point.c,
            point.num_iter,
        )?;
        debug!(
            fly = index,
            score,
            kc_score = fly.kc_score(),
            coverage = fly.vocabulary_coverage(),
            "fly scored"
        );
        Ok((score, model))
    }
}
