//! The outer Bayesian-optimization loop.
//!
//! ```text
//! Idle ─► [LoadingPriorLog] ─► Exploring ─► Exploiting ─► MergingLog ─► Done
//! ```
//!
//! Exploration draws uniform random points; exploitation asks the guided
//! optimizer. Every observation is streamed to the run log as soon as it is
//! known, and the run log is appended to the master log only when the whole
//! budget has been spent. A failed run leaves its run log on disk so it can
//! be resumed from.

use crate::automl::observation_log::{merge_into, read_observations, ObservationWriter};
use crate::automl::params::{FlyParam, ParamKey};
use crate::automl::search::{RandomSearch, SearchSpace, SearchStrategy, Trial, TrialResult};
use crate::automl::tpe::TPE;
use crate::classification::Classifier;
use crate::config::{RunPaths, SearchConfig};
use crate::encode::Encoder;
use crate::error::{FlyError, Result};
use crate::trial::{HyperparameterPoint, SearchState, TrialEvaluator};
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the controller is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Nothing has happened yet.
    Idle,
    /// Prior observations are being registered.
    LoadingPriorLog,
    /// Random exploration points.
    Exploring,
    /// Optimizer-guided points.
    Exploiting,
    /// Appending the run log to the master log.
    MergingLog,
    /// The run completed and its log is merged.
    Done,
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::LoadingPriorLog => "loading prior log",
            Self::Exploring => "exploring",
            Self::Exploiting => "exploiting",
            Self::MergingLog => "merging log",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Scores a hyperparameter point.
pub trait Objective {
    /// Return the value to maximise for `point`.
    ///
    /// # Errors
    ///
    /// Any error aborts the search.
    fn evaluate(&mut self, point: &HyperparameterPoint, state: &mut SearchState) -> Result<f64>;
}

impl<F> Objective for F
where
    F: FnMut(&HyperparameterPoint, &mut SearchState) -> Result<f64>,
{
    fn evaluate(&mut self, point: &HyperparameterPoint, state: &mut SearchState) -> Result<f64> {
        self(point, state)
    }
}

impl<E: Encoder, C: Classifier> Objective for TrialEvaluator<E, C> {
    fn evaluate(&mut self, point: &HyperparameterPoint, state: &mut SearchState) -> Result<f64> {
        TrialEvaluator::evaluate(self, point, state).map(|outcome| outcome.summary.avg)
    }
}

/// Best observation of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct BestObservation {
    /// The point as evaluated (rounded).
    pub point: HyperparameterPoint,
    /// The raw optimizer proposal.
    pub trial: Trial<FlyParam>,
    /// Objective value.
    pub target: f64,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// Best observation of this run (prior observations excluded).
    pub best: Option<BestObservation>,
    /// Points evaluated in this run.
    pub evaluated: usize,
    /// Observations registered from prior logs.
    pub prior_observations: usize,
    /// Best artifact written over the run, if any.
    pub best_artifact: Option<PathBuf>,
    /// The run's own observation log.
    pub run_log: PathBuf,
    /// The master log the run was merged into.
    pub master_log: PathBuf,
}

/// Fixed, non-searched settings of every point.
#[derive(Debug, Clone, Copy)]
struct PointConstants {
    num_nonzero: usize,
    num_iter: usize,
    num_trials: usize,
}

/// Drives a search over `{topword, KC_size, proj_size, C}`.
pub struct SearchController<S: SearchStrategy<FlyParam>> {
    space: SearchSpace<FlyParam>,
    explorer: RandomSearch,
    optimizer: S,
    n_iter: usize,
    constants: PointConstants,
    state: SearchState,
    phase: SearchPhase,
    run_log: PathBuf,
    master_log: PathBuf,
    prior_observations: usize,
}

impl SearchController<TPE<FlyParam>> {
    /// Controller with a TPE optimizer configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns `Config` for invalid settings.
    pub fn from_config(config: &SearchConfig, paths: &RunPaths) -> Result<Self> {
        let mut tpe = TPE::new(config.n_iter)
            .with_gamma(config.optimizer.gamma)
            .with_candidates(config.optimizer.n_candidates);
        if let Some(seed) = config.seed {
            // distinct stream from the random explorer
            tpe = tpe.with_seed(seed.wrapping_add(1));
        }
        Self::new(config, paths, tpe)
    }
}

impl<S: SearchStrategy<FlyParam>> SearchController<S> {
    /// Controller with a caller-supplied guided optimizer.
    ///
    /// # Errors
    ///
    /// Returns `Config` for invalid settings.
    pub fn new(config: &SearchConfig, paths: &RunPaths, optimizer: S) -> Result<Self> {
        config.validate()?;
        let bounds = &config.bounds;
        let space = SearchSpace::new()
            .add_continuous(FlyParam::TopWord, bounds.top_word.0, bounds.top_word.1)?
            .add_continuous(FlyParam::KcSize, bounds.kc_size.0, bounds.kc_size.1)?
            .add_continuous(FlyParam::ProjSize, bounds.proj_size.0, bounds.proj_size.1)?
            .add_continuous(FlyParam::C, bounds.c.0, bounds.c.1)?;

        let mut explorer = RandomSearch::new(config.init_points);
        if let Some(seed) = config.seed {
            explorer = explorer.with_seed(seed);
        }

        Ok(Self {
            space,
            explorer,
            optimizer,
            n_iter: config.n_iter,
            constants: PointConstants {
                num_nonzero: config.num_nonzero,
                num_iter: config.num_iter,
                num_trials: config.num_trials,
            },
            state: SearchState::new(),
            phase: SearchPhase::Idle,
            run_log: paths.temp_log.clone(),
            master_log: paths.master_log.clone(),
            prior_observations: 0,
        })
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// The guided optimizer.
    #[must_use]
    pub fn optimizer(&self) -> &S {
        &self.optimizer
    }

    /// The search space.
    #[must_use]
    pub fn space(&self) -> &SearchSpace<FlyParam> {
        &self.space
    }

    /// Best-score state shared with the evaluator.
    #[must_use]
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Register the observations of a prior log with the optimizer.
    ///
    /// Returns the number of observations registered. Must be called before
    /// [`SearchController::run`].
    ///
    /// # Errors
    ///
    /// Returns `Io`/`Parse` for unreadable logs and `Parse` for records
    /// naming unknown parameters or missing a searched one.
    pub fn load_prior(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        if !matches!(self.phase, SearchPhase::Idle | SearchPhase::LoadingPriorLog) {
            return Err(FlyError::Config(format!(
                "prior logs must be loaded before the search starts (phase: {})",
                self.phase
            )));
        }
        self.phase = SearchPhase::LoadingPriorLog;

        let results = read_observations(path)?
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let parse_err = |cause: String| FlyError::Parse {
                    file: path.to_path_buf(),
                    line: None,
                    cause: format!("record {}: {cause}", i + 1),
                };
                let result = record
                    .to_result()
                    .ok_or_else(|| parse_err("names an unknown parameter".to_string()))?;
                let missing = self.space.iter().find(|(k, _)| result.trial.get(k).is_none());
                if let Some((key, _)) = missing {
                    return Err(parse_err(format!("missing parameter {}", key.name())));
                }
                Ok(result)
            })
            .collect::<Result<Vec<TrialResult<FlyParam>>>>()?;

        self.optimizer.update(&results);
        self.prior_observations += results.len();
        info!(
            path = %path.display(),
            loaded = results.len(),
            known = self.optimizer.n_observations(),
            "optimizer is now aware of prior points"
        );
        Ok(results.len())
    }

    /// Run the full budget against `objective`.
    ///
    /// # Errors
    ///
    /// Propagates objective and log errors. The run log is left in place
    /// and is not merged when that happens.
    pub fn run<O: Objective + ?Sized>(&mut self, objective: &mut O) -> Result<SearchReport> {
        if !matches!(self.phase, SearchPhase::Idle | SearchPhase::LoadingPriorLog) {
            return Err(FlyError::Config(format!(
                "search already ran (phase: {})",
                self.phase
            )));
        }

        if let Some(dir) = self.master_log.parent() {
            std::fs::create_dir_all(dir)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.master_log)?;
        let mut writer = ObservationWriter::create(&self.run_log)?;
        let mut best: Option<BestObservation> = None;

        self.set_phase(SearchPhase::Exploring);
        let initial = self.explorer.suggest(&self.space, self.explorer.remaining());
        for trial in initial {
            self.step(trial, objective, &mut writer, &mut best)?;
        }

        self.set_phase(SearchPhase::Exploiting);
        for _ in 0..self.n_iter {
            let Some(trial) = self.optimizer.suggest(&self.space, 1).pop() else {
                warn!("optimizer stopped proposing points");
                break;
            };
            self.step(trial, objective, &mut writer, &mut best)?;
        }

        self.set_phase(SearchPhase::MergingLog);
        let evaluated = writer.written();
        drop(writer);
        merge_into(&self.run_log, &self.master_log)?;
        self.set_phase(SearchPhase::Done);

        if let Some(b) = &best {
            info!(target_score = b.target, trial = %b.trial, "final result");
        }
        Ok(SearchReport {
            best,
            evaluated,
            prior_observations: self.prior_observations,
            best_artifact: self.state.best_artifact().map(Path::to_path_buf),
            run_log: self.run_log.clone(),
            master_log: self.master_log.clone(),
        })
    }

    fn set_phase(&mut self, phase: SearchPhase) {
        info!(from = %self.phase, to = %phase, "search phase");
        self.phase = phase;
    }

    fn step<O: Objective + ?Sized>(
        &mut self,
        trial: Trial<FlyParam>,
        objective: &mut O,
        writer: &mut ObservationWriter,
        best: &mut Option<BestObservation>,
    ) -> Result<()> {
        let point = self.to_point(&trial)?;
        let target = objective.evaluate(&point, &mut self.state)?;
        writer.record(&trial, target)?;

        if best.as_ref().map_or(true, |b| target > b.target) {
            *best = Some(BestObservation {
                point,
                trial: trial.clone(),
                target,
            });
        }
        self.optimizer.update(&[TrialResult {
            trial,
            score: target,
        }]);
        Ok(())
    }

    /// Round the discrete dimensions and attach the fixed settings.
    fn to_point(&self, trial: &Trial<FlyParam>) -> Result<HyperparameterPoint> {
        let missing = |key: FlyParam| FlyError::invalid(key.name(), "missing", "a value");
        Ok(HyperparameterPoint {
            top_word: trial
                .get_rounded(&FlyParam::TopWord)
                .ok_or_else(|| missing(FlyParam::TopWord))?,
            kc_size: trial
                .get_rounded(&FlyParam::KcSize)
                .ok_or_else(|| missing(FlyParam::KcSize))?,
            proj_size: trial
                .get_rounded(&FlyParam::ProjSize)
                .ok_or_else(|| missing(FlyParam::ProjSize))?,
            c: trial.get(&FlyParam::C).ok_or_else(|| missing(FlyParam::C))?,
            num_nonzero: self.constants.num_nonzero,
            num_iter: self.constants.num_iter,
            num_trials: self.constants.num_trials,
        })
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
