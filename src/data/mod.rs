//! Vocabulary and dataset loading.
//!
//! - [`read_vocab`]: sentencepiece vocabulary → [`Vocabulary`] (`PN_SIZE`)
//! - [`read_corpus`]: `<doc>` files → weighted document-term [`Corpus`]
//! - [`Dataset`]: the fixed set of corpora the search knows about

mod corpus;
mod vocab;

pub use corpus::{read_corpus, Corpus, LabelEncoder};
pub use vocab::{read_vocab, Vocabulary};

use crate::error::{FlyError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The corpora the search can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// Wikipedia category classification
    Wiki,
    /// 20 Newsgroups
    News20,
    /// Web of Science (WOS-11967)
    Wos,
    /// Reuters-21578
    Reuters,
}

impl Dataset {
    /// All known datasets.
    pub const ALL: [Dataset; 4] = [Self::Wiki, Self::News20, Self::Wos, Self::Reuters];

    /// Selector as accepted on the command line.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wiki => "wiki",
            Self::News20 => "20news",
            Self::Wos => "wos",
            Self::Reuters => "reuters",
        }
    }

    /// Name used in log and model paths.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Wiki => "wikipedia",
            Self::News20 => "20news",
            Self::Wos => "wos",
            Self::Reuters => "reuters",
        }
    }

    fn layout(&self) -> (&'static str, &'static str) {
        match self {
            Self::Wiki => ("wikipedia", "wikipedia"),
            Self::News20 => ("20news-bydate", "20news-bydate"),
            Self::Wos => ("wos", "wos11967"),
            Self::Reuters => ("reuters", "reuters"),
        }
    }

    /// Training split under `data_root`.
    #[must_use]
    pub fn train_path(&self, data_root: &Path) -> PathBuf {
        let (dir, stem) = self.layout();
        data_root.join(dir).join(format!("{stem}-train.sp"))
    }

    /// Validation split under `data_root`.
    #[must_use]
    pub fn val_path(&self, data_root: &Path) -> PathBuf {
        let (dir, stem) = self.layout();
        data_root.join(dir).join(format!("{stem}-val.sp"))
    }

    /// Sentencepiece vocabulary under `spm_root`.
    #[must_use]
    pub fn vocab_path(&self, spm_root: &Path) -> PathBuf {
        spm_root.join(format!("spm.{}.vocab", self.name()))
    }
}

impl FromStr for Dataset {
    type Err = FlyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "wiki" | "wikipedia" => Ok(Self::Wiki),
            "20news" => Ok(Self::News20),
            "wos" => Ok(Self::Wos),
            "reuters" => Ok(Self::Reuters),
            other => Err(FlyError::invalid(
                "dataset",
                other,
                "one of wiki, 20news, wos, reuters",
            )),
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Train and validation splits sharing one vocabulary and label space.
#[derive(Debug, Clone)]
pub struct DatasetSplits {
    /// Input dimension (vocabulary size).
    pub pn_size: usize,
    /// Training split.
    pub train: Corpus,
    /// Validation split.
    pub val: Corpus,
    /// Class names.
    pub classes: LabelEncoder,
}

impl DatasetSplits {
    /// Assemble splits, checking they share the input dimension.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the splits disagree on column count.
    pub fn new(train: Corpus, val: Corpus, classes: LabelEncoder) -> Result<Self> {
        if train.features.n_cols() != val.features.n_cols() {
            return Err(FlyError::DimensionMismatch {
                expected: format!("{} validation columns", train.features.n_cols()),
                actual: format!("{} validation columns", val.features.n_cols()),
            });
        }
        Ok(Self {
            pn_size: train.features.n_cols(),
            train,
            val,
            classes,
        })
    }

    /// Load vocabulary and both splits of `dataset`.
    ///
    /// # Errors
    ///
    /// Propagates I/O and parse errors from the vocabulary and corpus files.
    pub fn load(dataset: Dataset, data_root: &Path, spm_root: &Path) -> Result<Self> {
        let vocab = read_vocab(dataset.vocab_path(spm_root))?;
        let mut classes = LabelEncoder::new();
        let train = read_corpus(dataset.train_path(data_root), &vocab, &mut classes)?;
        let val = read_corpus(dataset.val_path(data_root), &vocab, &mut classes)?;
        Self::new(train, val, classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_parse() {
        for d in Dataset::ALL {
            assert_eq!(d.as_str().parse::<Dataset>().unwrap(), d);
        }
        assert_eq!("WIKI".parse::<Dataset>().unwrap(), Dataset::Wiki);
        assert!("imdb".parse::<Dataset>().is_err());
    }

    #[test]
    fn test_dataset_paths() {
        let root = Path::new("../datasets");
        assert_eq!(
            Dataset::News20.train_path(root),
            PathBuf::from("../datasets/20news-bydate/20news-bydate-train.sp")
        );
        assert_eq!(
            Dataset::Wos.val_path(root),
            PathBuf::from("../datasets/wos/wos11967-val.sp")
        );
        assert_eq!(
            Dataset::Wiki.vocab_path(Path::new("../spm")),
            PathBuf::from("../spm/spm.wikipedia.vocab")
        );
        assert_eq!(Dataset::Wos.name(), "wos");
        assert_eq!(Dataset::News20.to_string(), "20news");
    }

    #[test]
    fn test_load_splits() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let spm = dir.path().join("spm");
        std::fs::create_dir_all(data.join("wos")).unwrap();
        std::fs::create_dir_all(&spm).unwrap();
        std::fs::write(spm.join("spm.wos.vocab"), "▁a\t-1\n▁b\t-2\n").unwrap();
        std::fs::write(
            data.join("wos/wos11967-train.sp"),
            "<doc id=1 class=x>\n▁a\n</doc>\n<doc id=2 class=y>\n▁b\n</doc>\n",
        )
        .unwrap();
        std::fs::write(data.join("wos/wos11967-val.sp"), "<doc id=3 class=y>\n▁b\n</doc>\n")
            .unwrap();

        let splits = DatasetSplits::load(Dataset::Wos, &data, &spm).unwrap();
        assert_eq!(splits.pn_size, 2);
        assert_eq!(splits.train.len(), 2);
        assert_eq!(splits.val.labels, vec![1]);
        assert_eq!(splits.classes.len(), 2);
    }

    #[test]
    fn test_splits_dimension_check() {
        let mut classes = LabelEncoder::new();
        classes.encode("a");
        let train = Corpus {
            features: crate::primitives::SparseMatrix::new(3),
            labels: vec![],
            ids: vec![],
        };
        let val = Corpus {
            features: crate::primitives::SparseMatrix::new(4),
            labels: vec![],
            ids: vec![],
        };
        assert!(DatasetSplits::new(train, val, classes).is_err());
    }
}
