use super::{HyperparameterPoint, TrialSummary};
use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Append-only tab-separated results log, one row per evaluated point.
///
/// Columns: `KC_size proj_size top_word num_nonzero C num_iter avg_score
/// std_score`. Each row goes out in a single `write_all` under a lock, so
/// concurrent writers never interleave partial rows.
#[derive(Debug)]
pub struct ResultsLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ResultsLog {
    /// Open `path` for appending, creating it and its parent directory.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Location of the log.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the row for `point`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the write fails.
    pub fn append(&self, point: &HyperparameterPoint, summary: &TrialSummary) -> Result<()> {
        let row = format_row(point, summary);
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(row.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

fn format_row(point: &HyperparameterPoint, summary: &TrialSummary) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
        point.kc_size,
        point.proj_size,
        point.top_word,
        point.num_nonzero,
        point.c,
        point.num_iter,
        summary.avg,
        summary.std
    )
}
