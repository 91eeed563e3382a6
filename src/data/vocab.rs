//! Subword vocabulary with log-probability derived weights.

use crate::error::{FlyError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Vocabulary read from a sentencepiece `.vocab` file.
///
/// Piece order follows the file, which lists pieces by descending frequency;
/// the projection strategies rely on that ordering.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    pieces: Vec<String>,
    index: HashMap<String, usize>,
    weights: Vec<f32>,
}

impl Vocabulary {
    /// Parse `piece<TAB>logprob` lines.
    ///
    /// Empty and duplicate pieces are skipped. The weight of a piece is
    /// `(-logprob)^3`, so rare pieces dominate document vectors.
    ///
    /// # Errors
    ///
    /// Returns `Parse` for lines without a tab or with a non-numeric logprob.
    ///
    /// # Example
    ///
    /// ```
    /// use flyhash::data::Vocabulary;
    /// use std::path::Path;
    ///
    /// let vocab = Vocabulary::parse("▁the\t-2\n▁fly\t-10\n", Path::new("spm.vocab"))
    ///     .expect("well-formed vocab");
    /// assert_eq!(vocab.len(), 2);
    /// assert_eq!(vocab.get("▁fly"), Some(1));
    /// assert_eq!(vocab.weight(0), 8.0);
    /// ```
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut vocab = Self::default();
        for (n, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let parse_err = |cause: String| FlyError::Parse {
                file: path.to_path_buf(),
                line: Some(n + 1),
                cause,
            };
            let (piece, logprob) = line
                .split_once('\t')
                .ok_or_else(|| parse_err("expected `piece<TAB>logprob`".to_string()))?;
            let logprob: f32 = logprob
                .trim()
                .parse()
                .map_err(|e| parse_err(format!("bad logprob {logprob:?}: {e}")))?;
            if piece.is_empty() || vocab.index.contains_key(piece) {
                continue;
            }
            vocab.index.insert(piece.to_string(), vocab.pieces.len());
            vocab.pieces.push(piece.to_string());
            vocab.weights.push((-logprob).powi(3));
        }
        Ok(vocab)
    }

    /// Number of pieces (the input dimension `PN_SIZE`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Whether the vocabulary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Index of a piece.
    #[must_use]
    pub fn get(&self, piece: &str) -> Option<usize> {
        self.index.get(piece).copied()
    }

    /// Piece at an index.
    #[must_use]
    pub fn piece(&self, i: usize) -> Option<&str> {
        self.pieces.get(i).map(String::as_str)
    }

    /// Weight of the piece at index `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[must_use]
    pub fn weight(&self, i: usize) -> f32 {
        self.weights[i]
    }
}

/// Read a vocabulary file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read and `Parse` on malformed lines.
pub fn read_vocab(path: impl AsRef<Path>) -> Result<Vocabulary> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    Vocabulary::parse(&text, path)
}
