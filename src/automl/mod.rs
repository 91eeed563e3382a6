//! Hyperparameter search over fly configurations.
//!
//! A search alternates between uniformly sampled points and points proposed
//! by a guided optimizer (TPE by default). Every observation is streamed to
//! a run log in newline-delimited JSON, and a completed run is appended to
//! the dataset's master log, which later runs can resume from.
//!
//! # Example
//!
//! ```
//! use flyhash::automl::{FlyParam, RandomSearch, SearchSpace, SearchStrategy};
//!
//! let space = SearchSpace::new()
//!     .add_continuous(FlyParam::KcSize, 300.0, 15000.0)
//!     .expect("valid interval")
//!     .add_continuous(FlyParam::C, 1.0, 1.1)
//!     .expect("valid interval");
//!
//! let mut search = RandomSearch::new(10).with_seed(42);
//! let trials = search.suggest(&space, 10);
//! assert_eq!(trials.len(), 10);
//! assert!(trials.iter().all(|t| t.get_rounded(&FlyParam::KcSize).is_some()));
//! ```

mod controller;
mod observation_log;
pub mod params;
mod search;
mod tpe;

pub use controller::{BestObservation, Objective, SearchController, SearchPhase, SearchReport};
pub use observation_log::{
    merge_into, read_observations, ObservationRecord, ObservationWriter, RecordTime,
};
pub use params::{FlyParam, ParamKey};
pub use search::{HyperParam, RandomSearch, SearchSpace, SearchStrategy, Trial, TrialResult};
pub use tpe::{TPEConfig, TPE};
