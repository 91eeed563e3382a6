//! Labelled document files and their document-term matrices.
//!
//! Corpus files hold pre-tokenized documents:
//!
//! ```text
//! <doc id=12 class=biology>
//! ▁the ▁fly ▁brain ...
//! </doc>
//! ```

use super::vocab::Vocabulary;
use crate::error::{FlyError, Result};
use crate::primitives::SparseMatrix;
use std::collections::HashMap;
use std::path::Path;

/// Maps class names to dense label indices.
///
/// Shared between the training and validation split so both agree on the
/// numbering.
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Creates an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `class`, assigning the next free one if unseen.
    pub fn encode(&mut self, class: &str) -> usize {
        if let Some(&i) = self.index.get(class) {
            return i;
        }
        let i = self.classes.len();
        self.index.insert(class.to_string(), i);
        self.classes.push(class.to_string());
        i
    }

    /// Class name for an index.
    #[must_use]
    pub fn decode(&self, label: usize) -> Option<&str> {
        self.classes.get(label).map(String::as_str)
    }

    /// Number of known classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// One split of a dataset.
#[derive(Debug, Clone)]
pub struct Corpus {
    /// Weighted document-term matrix (`n_docs × vocab.len()`).
    pub features: SparseMatrix,
    /// Label index per document.
    pub labels: Vec<usize>,
    /// Document ids as written in the file.
    pub ids: Vec<String>,
}

impl Corpus {
    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the split holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Parse corpus text.
    ///
    /// Tokens are lower-cased and split on spaces; each term count is
    /// multiplied by its vocabulary weight. Tokens missing from the
    /// vocabulary are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Parse` for headers without a class, nested or unterminated
    /// documents.
    pub fn parse(
        text: &str,
        path: &Path,
        vocab: &Vocabulary,
        labels: &mut LabelEncoder,
    ) -> Result<Self> {
        let parse_err = |line: usize, cause: &str| FlyError::Parse {
            file: path.to_path_buf(),
            line: Some(line),
            cause: cause.to_string(),
        };

        let mut corpus = Self {
            features: SparseMatrix::new(vocab.len()),
            labels: Vec::new(),
            ids: Vec::new(),
        };
        let mut open: Option<(usize, String)> = None;
        let mut counts: HashMap<usize, f32> = HashMap::new();

        for (n, line) in text.lines().enumerate() {
            let line_no = n + 1;
            if line.starts_with("<doc") {
                if open.is_some() {
                    return Err(parse_err(line_no, "nested <doc>"));
                }
                let (id, class) = parse_header(line)
                    .ok_or_else(|| parse_err(line_no, "document header without class"))?;
                corpus.ids.push(id);
                open = Some((line_no, class));
            } else if line.starts_with("</doc>") {
                let (_, class) = open
                    .take()
                    .ok_or_else(|| parse_err(line_no, "</doc> without <doc>"))?;
                corpus.labels.push(labels.encode(&class));
                corpus.features.push_row(
                    counts
                        .drain()
                        .map(|(i, count)| (i, count * vocab.weight(i))),
                )?;
            } else if open.is_some() {
                for token in line.split(' ').filter(|t| !t.is_empty()) {
                    if let Some(i) = vocab.get(&token.to_lowercase()) {
                        *counts.entry(i).or_insert(0.0) += 1.0;
                    }
                }
            }
        }

        if let Some((start, _)) = open {
            return Err(parse_err(start, "unterminated <doc>"));
        }
        Ok(corpus)
    }
}

/// Extract `(id, class)` from `<doc id=.. class=..>`.
fn parse_header(line: &str) -> Option<(String, String)> {
    let inner = line.trim().strip_prefix("<doc")?.strip_suffix('>')?;
    let mut id = String::new();
    let mut class = None;
    for attr in inner.split_whitespace() {
        match attr.split_once('=') {
            Some(("id", v)) => id = v.to_string(),
            Some(("class", v)) => class = Some(v.to_string()),
            _ => {}
        }
    }
    class.map(|c| (id, c))
}

/// Read and encode a corpus file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read and `Parse` on malformed content.
pub fn read_corpus(
    path: impl AsRef<Path>,
    vocab: &Vocabulary,
    labels: &mut LabelEncoder,
) -> Result<Corpus> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    Corpus::parse(&text, path, vocab, labels)
}
