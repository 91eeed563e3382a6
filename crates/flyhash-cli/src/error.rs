//! Error types for flyhash-search

use flyhash::FlyError;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// A file named on the command line does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid configuration or arguments
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Corpus or vocabulary could not be read
    #[error("Data error: {0}")]
    Data(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The search itself failed
    #[error("Search failed: {0}")]
    Search(#[source] FlyError),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::Search(_) => ExitCode::from(1),
            Self::Config(_) => ExitCode::from(2),
            Self::FileNotFound(_) => ExitCode::from(3),
            Self::Data(_) => ExitCode::from(4),
            Self::Io(_) => ExitCode::from(7),
        }
    }
}

impl From<FlyError> for CliError {
    fn from(e: FlyError) -> Self {
        match e {
            FlyError::Config(msg) => Self::Config(msg),
            FlyError::InvalidParameter { .. } => Self::Config(e.to_string()),
            FlyError::Parse { .. } => Self::Data(e.to_string()),
            FlyError::Io(io) => Self::Io(io),
            other => Self::Search(other),
        }
    }
}
