//! Randomized sparse binary projections (PN → KC).
//!
//! A projection maps an input vocabulary space of `pn_size` dimensions
//! ("projection neurons") to `kc_size` hidden units ("Kenyon cells"). Every
//! hidden unit samples a small support of `proj_size` input dimensions; the
//! strategy decides how that support is drawn.
//!
//! | Strategy | Draw | Coverage |
//! |---|---|---|
//! | `Uniform` (0) | uniform, with replacement | none guaranteed |
//! | `UniformCovering` (1) | shuffled blocks | every input used |
//! | `FrequencyWeighted` (2) | `P(i) ∝ 1/i` over `[50, pn)`, with replacement | none guaranteed |
//! | `FrequencyCovering` (3) | head/tail shuffled blocks | every input used |
//!
//! Strategies that draw with replacement keep duplicate draws collapsed, so
//! a row can end up with fewer than `proj_size` set bits.
//!
//! # References
//!
//! Dasgupta, Stevens & Navlakha (2017). A neural algorithm for a fundamental
//! computing problem. Science.

use crate::error::{FlyError, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Leading vocabulary indices (punctuation, stop words) skipped by
/// [`ProjectionStrategy::FrequencyWeighted`].
pub const FREQUENT_INDEX_OFFSET: usize = 50;

/// Share of the index range shuffled separately by
/// [`ProjectionStrategy::FrequencyCovering`].
pub const HEAD_FRACTION: f64 = 0.1;

/// How each hidden unit picks its input support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionStrategy {
    /// Uniform draws with replacement.
    Uniform,
    /// Consecutive blocks of repeatedly reshuffled indices.
    UniformCovering,
    /// Inverse-rank weighted draws with replacement, skipping the most frequent indices.
    FrequencyWeighted,
    /// Blocks of a head/tail shuffled order.
    #[default]
    FrequencyCovering,
}

impl ProjectionStrategy {
    /// Numeric selector (0–3).
    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            Self::Uniform => 0,
            Self::UniformCovering => 1,
            Self::FrequencyWeighted => 2,
            Self::FrequencyCovering => 3,
        }
    }

    /// Parse a numeric selector.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for selectors outside 0–3.
    pub fn from_index(selector: u8) -> Result<Self> {
        match selector {
            0 => Ok(Self::Uniform),
            1 => Ok(Self::UniformCovering),
            2 => Ok(Self::FrequencyWeighted),
            3 => Ok(Self::FrequencyCovering),
            other => Err(FlyError::invalid("projection_strategy", other, "0, 1, 2 or 3")),
        }
    }

    /// Whether the strategy guarantees every input index is used.
    #[must_use]
    pub fn is_covering(self) -> bool {
        matches!(self, Self::UniformCovering | Self::FrequencyCovering)
    }
}

/// Binary `(kc_size, pn_size)` matrix stored as per-row sorted column sets.
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionMatrix {
    kc_size: usize,
    pn_size: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
}

impl ProjectionMatrix {
    /// Build a projection with the given strategy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if a size is zero, if `proj_size > pn_size`,
    /// or if `FrequencyWeighted` is asked for with `pn_size <= 50`.
    ///
    /// # Example
    ///
    /// ```
    /// use flyhash::projection::{ProjectionMatrix, ProjectionStrategy};
    /// use rand::SeedableRng;
    ///
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    /// let proj = ProjectionMatrix::build(1000, 200, 4, ProjectionStrategy::default(), &mut rng)
    ///     .expect("valid sizes");
    /// assert_eq!(proj.shape(), (200, 1000));
    /// assert_eq!(proj.vocabulary_coverage(), 1.0);
    /// ```
    pub fn build<R: Rng + ?Sized>(
        pn_size: usize,
        kc_size: usize,
        proj_size: usize,
        strategy: ProjectionStrategy,
        rng: &mut R,
    ) -> Result<Self> {
        validate(pn_size, kc_size, proj_size)?;

        let rows = match strategy {
            ProjectionStrategy::Uniform => uniform_rows(pn_size, kc_size, proj_size, rng),
            ProjectionStrategy::UniformCovering => {
                let order: Vec<usize> = (0..pn_size).collect();
                covering_rows(kc_size, proj_size, rng, |rng| {
                    let mut pass = order.clone();
                    pass.shuffle(rng);
                    pass
                })
            }
            ProjectionStrategy::FrequencyWeighted => {
                weighted_rows(pn_size, kc_size, proj_size, rng)?
            }
            ProjectionStrategy::FrequencyCovering => {
                let split = (HEAD_FRACTION * pn_size as f64) as usize;
                let head: Vec<usize> = (0..split).collect();
                let tail: Vec<usize> = (split..pn_size).collect();
                covering_rows(kc_size, proj_size, rng, |rng| {
                    let mut first = head.clone();
                    let mut second = tail.clone();
                    first.shuffle(rng);
                    second.shuffle(rng);
                    first.extend(second);
                    first
                })
            }
        };

        Ok(Self::from_row_sets(pn_size, rows))
    }

    fn from_row_sets(pn_size: usize, rows: Vec<Vec<usize>>) -> Self {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        indptr.push(0);
        for mut row in rows {
            row.sort_unstable();
            row.dedup();
            indices.extend(row);
            indptr.push(indices.len());
        }
        Self {
            kc_size: indptr.len() - 1,
            pn_size,
            indptr,
            indices,
        }
    }

    /// Returns the shape as `(kc_size, pn_size)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.kc_size, self.pn_size)
    }

    /// Number of hidden units.
    #[must_use]
    pub fn kc_size(&self) -> usize {
        self.kc_size
    }

    /// Input dimension.
    #[must_use]
    pub fn pn_size(&self) -> usize {
        self.pn_size
    }

    /// Input columns set in row `i`, sorted ascending.
    ///
    /// # Panics
    ///
    /// Panics if `i >= kc_size()`.
    #[must_use]
    pub fn row(&self, i: usize) -> &[usize] {
        &self.indices[self.indptr[i]..self.indptr[i + 1]]
    }

    /// Total number of set bits.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Fraction of hidden units with at least one input.
    ///
    /// Despite the name this counts rows, not input columns: it is
    /// `1 - empty_rows / kc_size`. See [`Self::input_coverage`] for the
    /// column-wise figure.
    #[must_use]
    pub fn vocabulary_coverage(&self) -> f64 {
        let empty = self.indptr.windows(2).filter(|w| w[0] == w[1]).count();
        1.0 - empty as f64 / self.kc_size as f64
    }

    /// Fraction of input columns used by at least one hidden unit.
    #[must_use]
    pub fn input_coverage(&self) -> f64 {
        let mut seen = vec![false; self.pn_size];
        for &col in &self.indices {
            seen[col] = true;
        }
        seen.iter().filter(|&&s| s).count() as f64 / self.pn_size as f64
    }

    /// Inverted index: for each input column, the hidden units reading it.
    #[must_use]
    pub fn column_index(&self) -> Vec<Vec<usize>> {
        let mut cols = vec![Vec::new(); self.pn_size];
        for kc in 0..self.kc_size {
            for &pn in self.row(kc) {
                cols[pn].push(kc);
            }
        }
        cols
    }
}

fn validate(pn_size: usize, kc_size: usize, proj_size: usize) -> Result<()> {
    if pn_size == 0 {
        return Err(FlyError::invalid("pn_size", pn_size, "> 0"));
    }
    if kc_size == 0 {
        return Err(FlyError::invalid("kc_size", kc_size, "> 0"));
    }
    if proj_size == 0 {
        return Err(FlyError::invalid("proj_size", proj_size, "> 0"));
    }
    if proj_size > pn_size {
        return Err(FlyError::invalid(
            "proj_size",
            proj_size,
            format!("<= pn_size ({pn_size})"),
        ));
    }
    Ok(())
}

fn uniform_rows<R: Rng + ?Sized>(
    pn_size: usize,
    kc_size: usize,
    proj_size: usize,
    rng: &mut R,
) -> Vec<Vec<usize>> {
    (0..kc_size)
        .map(|_| (0..proj_size).map(|_| rng.gen_range(0..pn_size)).collect())
        .collect()
}

fn weighted_rows<R: Rng + ?Sized>(
    pn_size: usize,
    kc_size: usize,
    proj_size: usize,
    rng: &mut R,
) -> Result<Vec<Vec<usize>>> {
    if pn_size <= FREQUENT_INDEX_OFFSET {
        return Err(FlyError::invalid(
            "pn_size",
            pn_size,
            format!("> {FREQUENT_INDEX_OFFSET} for frequency-weighted projections"),
        ));
    }
    let weights: Vec<f64> = (FREQUENT_INDEX_OFFSET..pn_size)
        .map(|i| 1.0 / i as f64)
        .collect();
    let dist = WeightedIndex::new(&weights)
        .map_err(|e| FlyError::invalid("pn_size", pn_size, e.to_string()))?;

    Ok((0..kc_size)
        .map(|_| {
            (0..proj_size)
                .map(|_| FREQUENT_INDEX_OFFSET + dist.sample(rng))
                .collect()
        })
        .collect())
}

/// Fill `kc_size` rows with consecutive `proj_size` blocks of successive
/// passes produced by `next_pass`; the tail of the final pass is discarded.
fn covering_rows<R, F>(
    kc_size: usize,
    proj_size: usize,
    rng: &mut R,
    mut next_pass: F,
) -> Vec<Vec<usize>>
where
    R: Rng + ?Sized,
    F: FnMut(&mut R) -> Vec<usize>,
{
    let mut rows = Vec::with_capacity(kc_size);
    while rows.len() < kc_size {
        let pass = next_pass(rng);
        for block in pass.chunks(proj_size) {
            rows.push(block.to_vec());
            if rows.len() >= kc_size {
                break;
            }
        }
    }
    rows
}
