use crate::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSION: &str = "sav";

/// Directory holding exactly one best-model artifact.
///
/// Replacement writes the new file under a temporary name, renames it into
/// place and only then removes older artifacts, so the directory never goes
/// through a state with zero artifacts.
#[derive(Debug, Clone)]
pub struct BestArtifactStore {
    dir: PathBuf,
}

impl BestArtifactStore {
    /// Use `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The artifact directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `model` as `{stem}.sav` and delete every other artifact.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails and `Io` on file errors.
    pub fn replace<M: Serialize>(&self, stem: &str, model: &M) -> Result<PathBuf> {
        let target = self.dir.join(format!("{stem}.{EXTENSION}"));
        let staging = self.dir.join(format!(".{stem}.{EXTENSION}.tmp"));

        let mut writer = BufWriter::new(File::create(&staging)?);
        bincode::serialize_into(&mut writer, model)?;
        writer.flush()?;
        drop(writer);
        std::fs::rename(&staging, &target)?;

        for old in self.artifacts()? {
            if old != target {
                debug!(path = %old.display(), "removing superseded artifact");
                std::fs::remove_file(old)?;
            }
        }
        Ok(target)
    }

    /// Current `.sav` files in the directory.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be listed.
    pub fn artifacts(&self) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == EXTENSION) {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }
}
