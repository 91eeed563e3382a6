//! Error types for flyhash operations.
//!
//! Every failure in the search is surfaced to the operator: there is no
//! retry anywhere in the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for flyhash operations.
pub type Result<T> = std::result::Result<T, FlyError>;

/// Main error type for flyhash operations.
///
/// # Examples
///
/// ```
/// use flyhash::error::FlyError;
///
/// let err = FlyError::InvalidParameter {
///     param: "proj_size".to_string(),
///     value: "0".to_string(),
///     constraint: "> 0".to_string(),
/// };
/// assert!(err.to_string().contains("proj_size"));
/// ```
#[derive(Error, Debug)]
pub enum FlyError {
    /// Invalid construction or search parameter.
    #[error("Invalid parameter: {param} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Matrix dimensions don't match for the operation.
    #[error("Matrix dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Classifier training produced a non-finite loss.
    #[error("Convergence failure after {iterations} iterations, loss = {final_loss}")]
    ConvergenceFailure {
        /// Number of iterations attempted
        iterations: usize,
        /// Final loss value
        final_loss: f64,
    },

    /// Malformed vocabulary, corpus or log file.
    #[error("Parse error in {}{}: {cause}", file.display(), line.map(|l| format!(":{l}")).unwrap_or_default())]
    Parse {
        /// File being parsed
        file: PathBuf,
        /// 1-based line number, when known
        line: Option<usize>,
        /// What went wrong
        cause: String,
    },

    /// I/O error while reading data or writing logs/artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration file or value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker pool could not be created.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Every fly of a hyperparameter point failed (isolation mode only).
    #[error("All {trials} trials failed; first error: {first}")]
    AllTrialsFailed {
        /// Number of trials attempted
        trials: usize,
        /// Message of the first failure
        first: String,
    },
}

impl FlyError {
    /// Shorthand for [`FlyError::InvalidParameter`].
    pub(crate) fn invalid(
        param: &str,
        value: impl ToString,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.into(),
        }
    }
}

impl From<serde_json::Error> for FlyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for FlyError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for FlyError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for FlyError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(err.to_string())
    }
}
