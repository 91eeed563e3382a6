//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use flyhash::prelude::*;
//! ```

pub use crate::automl::{Objective, SearchController, SearchReport, TPE};
pub use crate::classification::{Classifier, SoftmaxRegression};
pub use crate::config::{RunPaths, SearchConfig};
pub use crate::data::{Dataset, DatasetSplits};
pub use crate::encode::{Encoder, FlyHashEncoder};
pub use crate::error::{FlyError, Result};
pub use crate::fly::Fly;
pub use crate::primitives::SparseMatrix;
pub use crate::projection::{ProjectionMatrix, ProjectionStrategy};
pub use crate::trial::{HyperparameterPoint, SearchState, TrialEvaluator};
