//! Search configuration.
//!
//! Every field has a default matching the reference search setup, so an
//! empty TOML file is a valid configuration:
//!
//! ```toml
//! num_trials = 3
//! init_points = 100
//! n_iter = 400
//!
//! [bounds]
//! kc_size = [300.0, 15000.0]
//! proj_size = [2.0, 20.0]
//! ```

use crate::error::{FlyError, Result};
use crate::projection::ProjectionStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Closed intervals searched for each optimized dimension.
///
/// `top_word` and `C` default to near-point intervals, effectively pinning
/// them while keeping them searchable through configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBounds {
    /// Words kept per document before projection.
    pub top_word: (f64, f64),
    /// Number of hidden units.
    pub kc_size: (f64, f64),
    /// Inputs per hidden unit.
    pub proj_size: (f64, f64),
    /// Inverse regularisation strength of the classifier.
    pub c: (f64, f64),
}

impl Default for SearchBounds {
    fn default() -> Self {
        Self {
            top_word: (400.0, 400.1),
            kc_size: (300.0, 15000.0),
            proj_size: (2.0, 20.0),
            c: (1.0, 1.1),
        }
    }
}

/// TPE tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Quantile splitting good from bad observations.
    pub gamma: f64,
    /// Candidates scored per proposal.
    pub n_candidates: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            gamma: 0.25,
            n_candidates: 24,
        }
    }
}

/// Full configuration of one search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search ranges.
    pub bounds: SearchBounds,
    /// Winners kept by the hidden-layer WTA.
    pub num_nonzero: usize,
    /// Classifier iteration budget.
    pub num_iter: usize,
    /// Flies evaluated per hyperparameter point.
    pub num_trials: usize,
    /// Random exploration points.
    pub init_points: usize,
    /// Guided points after exploration.
    pub n_iter: usize,
    /// Projection construction strategy.
    pub projection_strategy: ProjectionStrategy,
    /// Share of hardware threads used for trial workers.
    pub worker_fraction: f64,
    /// Explicit worker count, overriding `worker_fraction`.
    pub workers: Option<usize>,
    /// Exclude failing flies from aggregation instead of failing the point.
    pub isolate_trial_failures: bool,
    /// Seed for reproducible runs.
    pub seed: Option<u64>,
    /// Optimizer settings.
    pub optimizer: OptimizerConfig,
    /// Results and observation logs.
    pub log_dir: PathBuf,
    /// Parent of the per-run best-model directory.
    pub model_dir: PathBuf,
    /// Root of the prepared corpora.
    pub data_root: PathBuf,
    /// Directory of sentencepiece vocabularies.
    pub spm_root: PathBuf,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            bounds: SearchBounds::default(),
            num_nonzero: 300,
            num_iter: 2000,
            num_trials: 3,
            init_points: 100,
            n_iter: 400,
            projection_strategy: ProjectionStrategy::default(),
            worker_fraction: 0.2,
            workers: None,
            isolate_trial_failures: false,
            seed: None,
            optimizer: OptimizerConfig::default(),
            log_dir: PathBuf::from("./log"),
            model_dir: PathBuf::from("./models/classification"),
            data_root: PathBuf::from("../datasets"),
            spm_root: PathBuf::from("../spm"),
        }
    }
}

impl SearchConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `Config` for malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `Config` otherwise.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Layout of a run on `dataset` started at `timestamp`.
    #[must_use]
    pub fn run_paths(&self, dataset: &str, timestamp: &str) -> RunPaths {
        RunPaths::new(&self.log_dir, &self.model_dir, dataset, timestamp)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let bounds = [
            ("top_word", self.bounds.top_word, 1.0),
            ("kc_size", self.bounds.kc_size, 1.0),
            ("proj_size", self.bounds.proj_size, 1.0),
            ("C", self.bounds.c, f64::MIN_POSITIVE),
        ];
        for (name, (low, high), min) in bounds {
            if !(low.is_finite() && high.is_finite()) || low > high {
                return Err(FlyError::Config(format!(
                    "bounds.{name} = ({low}, {high}) is not an interval"
                )));
            }
            if low < min {
                return Err(FlyError::Config(format!(
                    "bounds.{name} lower bound {low} must be >= {min}"
                )));
            }
        }
        if self.num_trials == 0 {
            return Err(FlyError::Config("num_trials must be > 0".to_string()));
        }
        if self.num_nonzero == 0 {
            return Err(FlyError::Config("num_nonzero must be > 0".to_string()));
        }
        if !(self.worker_fraction > 0.0 && self.worker_fraction <= 1.0) {
            return Err(FlyError::Config(format!(
                "worker_fraction {} must be in (0, 1]",
                self.worker_fraction
            )));
        }
        if self.workers == Some(0) {
            return Err(FlyError::Config("workers must be > 0".to_string()));
        }
        if !(self.optimizer.gamma > 0.0 && self.optimizer.gamma < 1.0) {
            return Err(FlyError::Config(format!(
                "optimizer.gamma {} must be in (0, 1)",
                self.optimizer.gamma
            )));
        }
        Ok(())
    }

    /// Size of the trial worker pool.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
            worker_count_for(cpus, self.worker_fraction)
        })
    }
}

/// File layout of one search run on one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    /// Tab-separated results log, shared by every run on the dataset.
    pub results_log: PathBuf,
    /// Durable observation log, merged into at the end of each run.
    pub master_log: PathBuf,
    /// Observation log streamed during this run.
    pub temp_log: PathBuf,
    /// Directory holding this run's best model.
    pub model_dir: PathBuf,
}

impl RunPaths {
    /// Layout for `dataset` stamped with `timestamp`.
    #[must_use]
    pub fn new(log_dir: &Path, model_dir: &Path, dataset: &str, timestamp: &str) -> Self {
        Self {
            results_log: log_dir.join(format!("logs_{dataset}.tsv")),
            master_log: log_dir.join(format!("logs_{dataset}.json")),
            temp_log: log_dir.join(format!("logs_{dataset}_{timestamp}.json")),
            model_dir: model_dir.join(format!("{dataset}_{timestamp}")),
        }
    }
}

/// Run timestamp used in file names, e.g. `2024-05-01_13-45-10`.
#[must_use]
pub fn run_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// `max(1, floor(cpus * fraction))`.
#[must_use]
pub fn worker_count_for(cpus: usize, fraction: f64) -> usize {
    ((cpus as f64 * fraction) as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.num_nonzero, 300);
        assert_eq!(config.num_iter, 2000);
        assert_eq!(config.num_trials, 3);
        assert_eq!(config.init_points, 100);
        assert_eq!(config.n_iter, 400);
        assert_eq!(config.bounds.top_word, (400.0, 400.1));
        assert_eq!(config.projection_strategy, ProjectionStrategy::FrequencyCovering);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(SearchConfig::from_toml_str("").unwrap(), SearchConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = SearchConfig::from_toml_str(
            r#"
            num_trials = 5
            projection_strategy = "uniform_covering"
            seed = 7

            [bounds]
            kc_size = [100.0, 200.0]

            [optimizer]
            n_candidates = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.num_trials, 5);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.projection_strategy, ProjectionStrategy::UniformCovering);
        assert_eq!(config.bounds.kc_size, (100.0, 200.0));
        assert_eq!(config.bounds.proj_size, (2.0, 20.0));
        assert_eq!(config.optimizer.n_candidates, 64);
        assert_eq!(config.optimizer.gamma, 0.25);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let err = SearchConfig::from_toml_str("[bounds]\nproj_size = [20.0, 2.0]\n").unwrap_err();
        assert!(err.to_string().contains("proj_size"));
    }

    #[test]
    fn test_rejects_zero_trials() {
        assert!(SearchConfig::from_toml_str("num_trials = 0").is_err());
    }

    #[test]
    fn test_rejects_bad_worker_fraction() {
        assert!(SearchConfig::from_toml_str("worker_fraction = 0.0").is_err());
        assert!(SearchConfig::from_toml_str("worker_fraction = 1.5").is_err());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = SearchConfig::from_toml_str("num_trials = \"three\"").unwrap_err();
        assert!(matches!(err, FlyError::Config(_)));
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(worker_count_for(16, 0.2), 3);
        assert_eq!(worker_count_for(4, 0.2), 1);
        assert_eq!(worker_count_for(1, 0.2), 1);
        let config = SearchConfig {
            workers: Some(6),
            ..SearchConfig::default()
        };
        assert_eq!(config.worker_count(), 6);
        assert!(SearchConfig::default().worker_count() >= 1);
    }

    #[test]
    fn test_run_paths() {
        let config = SearchConfig::default();
        let paths = config.run_paths("wos", "2024-05-01_13-45-10");
        assert_eq!(paths.results_log, PathBuf::from("./log/logs_wos.tsv"));
        assert_eq!(paths.master_log, PathBuf::from("./log/logs_wos.json"));
        assert_eq!(
            paths.temp_log,
            PathBuf::from("./log/logs_wos_2024-05-01_13-45-10.json")
        );
        assert_eq!(
            paths.model_dir,
            PathBuf::from("./models/classification/wos_2024-05-01_13-45-10")
        );
    }

    #[test]
    fn test_run_timestamp_is_filesystem_safe() {
        let stamp = run_timestamp();
        assert_eq!(stamp.len(), 19);
        assert!(!stamp.contains(' ') && !stamp.contains(':'));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.toml");
        std::fs::write(&path, "n_iter = 10\ninit_points = 2\n").unwrap();
        let config = SearchConfig::from_file(&path).unwrap();
        assert_eq!(config.n_iter, 10);
        assert_eq!(config.init_points, 2);
    }
}
