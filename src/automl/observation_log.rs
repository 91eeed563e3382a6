//! Newline-delimited JSON observation logs.
//!
//! One record per evaluated point:
//!
//! ```text
//! {"target":0.71,"params":{"C":1.04,"KC_size":8123.5,"proj_size":6.2,"topword":400.03},
//!  "datetime":{"datetime":"2024-05-01 13:45:10","elapsed":12.5,"delta":12.5}}
//! ```
//!
//! A run streams records to its own file; at the end of a run that file is
//! appended verbatim to the dataset's master log.

use crate::automl::params::{FlyParam, ParamKey};
use crate::automl::search::{Trial, TrialResult};
use crate::error::{FlyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Wall-clock information attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordTime {
    /// Local time the record was written.
    pub datetime: String,
    /// Seconds since the writer was created.
    pub elapsed: f64,
    /// Seconds since the previous record.
    pub delta: f64,
}

/// One `{params, target}` observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Objective value.
    pub target: f64,
    /// Raw (unrounded) parameter values keyed by log name.
    pub params: BTreeMap<String, f64>,
    /// Timing; absent in hand-written logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<RecordTime>,
}

impl ObservationRecord {
    /// Convert to an optimizer observation.
    ///
    /// Returns `None` if a parameter name is unknown.
    #[must_use]
    pub fn to_result(&self) -> Option<TrialResult<FlyParam>> {
        let values = self
            .params
            .iter()
            .map(|(name, &v)| FlyParam::from_name(name).map(|k| (k, v)))
            .collect::<Option<BTreeMap<_, _>>>()?;
        Some(TrialResult {
            trial: Trial { values },
            score: self.target,
        })
    }
}

/// Streams records to a run-scoped log, flushing after every record.
#[derive(Debug)]
pub struct ObservationWriter {
    path: PathBuf,
    out: BufWriter<File>,
    started: Instant,
    last: Instant,
    written: usize,
}

impl ObservationWriter {
    /// Create (or truncate) the log at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let out = BufWriter::new(File::create(&path)?);
        let now = Instant::now();
        Ok(Self {
            path,
            out,
            started: now,
            last: now,
            written: 0,
        })
    }

    /// Location of the log.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Append one observation and flush it to disk.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Serialization` on failure.
    pub fn record<P: ParamKey>(&mut self, trial: &Trial<P>, target: f64) -> Result<ObservationRecord> {
        let now = Instant::now();
        let record = ObservationRecord {
            target,
            params: trial
                .values
                .iter()
                .map(|(k, &v)| (k.name().to_string(), v))
                .collect(),
            datetime: Some(RecordTime {
                datetime: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                elapsed: now.duration_since(self.started).as_secs_f64(),
                delta: now.duration_since(self.last).as_secs_f64(),
            }),
        };
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.last = now;
        self.written += 1;
        Ok(record)
    }
}

/// Read every record of a log. Blank lines are skipped.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read and `Parse` (with line number)
/// for a malformed record.
pub fn read_observations(path: impl AsRef<Path>) -> Result<Vec<ObservationRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| FlyError::Parse {
            file: path.to_path_buf(),
            line: Some(n + 1),
            cause: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Append the raw contents of `run_log` to `master`, creating `master` if
/// needed. Returns the number of bytes copied.
///
/// # Errors
///
/// Returns `Io` on read or write failure.
pub fn merge_into(run_log: impl AsRef<Path>, master: impl AsRef<Path>) -> Result<u64> {
    let mut source = File::open(run_log)?;
    let mut target = OpenOptions::new().create(true).append(true).open(master)?;
    let copied = io::copy(&mut source, &mut target)?;
    target.flush()?;
    Ok(copied)
}
