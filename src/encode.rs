//! Fly hashing: documents → sparse binary hash codes.
//!
//! Encoding runs in three steps per document:
//!
//! 1. keep only the `top_words` heaviest input dimensions,
//! 2. project them onto the hidden units (`kc = x · Wᵀ`),
//! 3. winner-take-all: the `wta_percent` most activated hidden units become 1.

use crate::error::{FlyError, Result};
use crate::primitives::{SparseMatrix, SparseRow};
use crate::projection::ProjectionMatrix;

/// Turns a document-term matrix into hash codes under a projection.
pub trait Encoder: Send + Sync {
    /// Encode `data` (`n_docs × pn_size`) into `n_docs × kc_size` binary codes.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `data` and `projection` disagree on the
    /// input dimension.
    fn encode(
        &self,
        data: &SparseMatrix,
        projection: &ProjectionMatrix,
        wta_percent: f64,
        top_words: usize,
    ) -> Result<SparseMatrix>;
}

/// The standard fly hash.
///
/// # Example
///
/// ```
/// use flyhash::encode::{Encoder, FlyHashEncoder};
/// use flyhash::primitives::SparseMatrix;
/// use flyhash::projection::{ProjectionMatrix, ProjectionStrategy};
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
/// let proj = ProjectionMatrix::build(20, 10, 3, ProjectionStrategy::UniformCovering, &mut rng)
///     .expect("valid sizes");
/// let docs = SparseMatrix::from_rows(20, vec![vec![(0, 2.0), (5, 1.0), (19, 3.0)]])
///     .expect("columns in range");
///
/// let codes = FlyHashEncoder.encode(&docs, &proj, 20.0, 2).expect("dimensions match");
/// assert_eq!(codes.shape(), (1, 10));
/// assert!(codes.row(0).nnz() <= 2);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FlyHashEncoder;

impl Encoder for FlyHashEncoder {
    fn encode(
        &self,
        data: &SparseMatrix,
        projection: &ProjectionMatrix,
        wta_percent: f64,
        top_words: usize,
    ) -> Result<SparseMatrix> {
        if data.n_cols() != projection.pn_size() {
            return Err(FlyError::DimensionMismatch {
                expected: format!("{} input columns", projection.pn_size()),
                actual: format!("{} input columns", data.n_cols()),
            });
        }

        let kc_size = projection.kc_size();
        let k = winner_count(kc_size, wta_percent);
        let columns = projection.column_index();

        let mut out = SparseMatrix::new(kc_size);
        let mut activation = vec![0.0_f32; kc_size];
        let mut touched_flag = vec![false; kc_size];
        let mut touched = Vec::new();

        for row in data.rows() {
            for (pn, x) in top_entries(row, top_words) {
                for &kc in &columns[pn] {
                    if !touched_flag[kc] {
                        touched_flag[kc] = true;
                        touched.push(kc);
                    }
                    activation[kc] += x;
                }
            }

            let mut active: Vec<(usize, f32)> = touched
                .iter()
                .map(|&kc| (kc, activation[kc]))
                .filter(|&(_, a)| a > 0.0)
                .collect();
            active.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            active.truncate(k);
            out.push_row(active.into_iter().map(|(kc, _)| (kc, 1.0)))?;

            for &kc in &touched {
                activation[kc] = 0.0;
                touched_flag[kc] = false;
            }
            touched.clear();
        }

        Ok(out)
    }
}

/// Number of winners kept for a WTA percentage, clamped to `[1, kc_size]`.
#[must_use]
pub fn winner_count(kc_size: usize, wta_percent: f64) -> usize {
    let k = (kc_size as f64 * wta_percent / 100.0).floor() as usize;
    k.clamp(1, kc_size.max(1))
}

/// The `k` largest entries of a row; ties go to the lower column.
fn top_entries(row: SparseRow<'_>, k: usize) -> Vec<(usize, f32)> {
    let mut entries: Vec<(usize, f32)> = row.iter().collect();
    if entries.len() > k {
        entries.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        entries.truncate(k);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionStrategy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn identity_projection(n: usize) -> ProjectionMatrix {
        // kc == pn and every hidden unit reads exactly its own input
        let mut rng = StdRng::seed_from_u64(0);
        let p = ProjectionMatrix::build(n, n, 1, ProjectionStrategy::UniformCovering, &mut rng)
            .unwrap();
        assert_eq!(p.input_coverage(), 1.0);
        p
    }

    #[test]
    fn test_winner_count() {
        assert_eq!(winner_count(1000, 30.0), 300);
        assert_eq!(winner_count(200, 20.0), 40);
        assert_eq!(winner_count(10, 1.0), 1);
        assert_eq!(winner_count(10, 250.0), 10);
    }

    #[test]
    fn test_top_entries_keeps_heaviest() {
        let m = SparseMatrix::from_rows(6, vec![vec![(0, 1.0), (1, 5.0), (2, 3.0), (5, 5.0)]])
            .unwrap();
        let top = top_entries(m.row(0), 2);
        assert_eq!(top, vec![(1, 5.0), (5, 5.0)]);
        assert_eq!(top_entries(m.row(0), 10).len(), 4);
    }

    #[test]
    fn test_encode_identity_projection_selects_top_words() {
        let p = identity_projection(8);
        let docs = SparseMatrix::from_rows(
            8,
            vec![vec![(0, 1.0), (3, 4.0), (6, 2.0), (7, 0.5)]],
        )
        .unwrap();
        // keep 2 words, allow all 8 winners: only the two heaviest inputs survive
        let codes = FlyHashEncoder.encode(&docs, &p, 100.0, 2).unwrap();
        let mut kcs: Vec<usize> = codes.row(0).indices.iter().map(|&kc| p.row(kc)[0]).collect();
        kcs.sort_unstable();
        assert_eq!(kcs, vec![3, 6]);
        assert!(codes.row(0).values.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_encode_wta_limits_winners() {
        let p = identity_projection(10);
        let doc: Vec<(usize, f32)> = (0..10).map(|i| (i, 1.0 + i as f32)).collect();
        let docs = SparseMatrix::from_rows(10, vec![doc]).unwrap();
        let codes = FlyHashEncoder.encode(&docs, &p, 30.0, 10).unwrap();
        assert_eq!(codes.row(0).nnz(), 3);
        let mut winners: Vec<usize> = codes.row(0).indices.iter().map(|&kc| p.row(kc)[0]).collect();
        winners.sort_unstable();
        assert_eq!(winners, vec![7, 8, 9]);
    }

    #[test]
    fn test_encode_empty_document_gives_empty_code() {
        let p = identity_projection(4);
        let docs = SparseMatrix::from_rows(4, vec![Vec::<(usize, f32)>::new()]).unwrap();
        let codes = FlyHashEncoder.encode(&docs, &p, 50.0, 4).unwrap();
        assert_eq!(codes.row(0).nnz(), 0);
    }

    #[test]
    fn test_encode_dimension_mismatch() {
        let p = identity_projection(4);
        let docs = SparseMatrix::new(5);
        let err = FlyHashEncoder.encode(&docs, &p, 50.0, 4).unwrap_err();
        assert!(matches!(err, FlyError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_encode_is_deterministic_for_a_projection() {
        let mut rng = StdRng::seed_from_u64(9);
        let p = ProjectionMatrix::build(200, 80, 4, ProjectionStrategy::default(), &mut rng)
            .unwrap();
        let rows: Vec<Vec<(usize, f32)>> = (0..5)
            .map(|d| (0..30).map(|i| ((i * 7 + d) % 200, (i % 5) as f32 + 1.0)).collect())
            .collect();
        let docs = SparseMatrix::from_rows(200, rows).unwrap();
        let a = FlyHashEncoder.encode(&docs, &p, 10.0, 20).unwrap();
        let b = FlyHashEncoder.encode(&docs, &p, 10.0, 20).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.n_rows(), 5);
        assert!(a.rows().all(|r| r.nnz() <= 8));
    }
}
