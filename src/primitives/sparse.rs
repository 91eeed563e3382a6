//! Compressed sparse row matrix.

use crate::error::{FlyError, Result};
use serde::{Deserialize, Serialize};

/// Borrowed view of one row of a [`SparseMatrix`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseRow<'a> {
    /// Column indices, strictly increasing.
    pub indices: &'a [usize],
    /// Values aligned with `indices`.
    pub values: &'a [f32],
}

impl<'a> SparseRow<'a> {
    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Iterate over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + 'a {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

/// A row-major sparse matrix of `f32` values (CSR layout).
///
/// Rows are appended one at a time; within a row, columns are kept sorted and
/// unique.
///
/// # Examples
///
/// ```
/// use flyhash::primitives::SparseMatrix;
///
/// let mut m = SparseMatrix::new(4);
/// m.push_row([(3, 1.0), (0, 2.0)]).expect("columns in range");
/// m.push_row([]).expect("empty row");
/// assert_eq!(m.shape(), (2, 4));
/// assert_eq!(m.get(0, 3), 1.0);
/// assert_eq!(m.row(1).nnz(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f32>,
}

impl SparseMatrix {
    /// Creates an empty matrix with `n_cols` columns and no rows.
    #[must_use]
    pub fn new(n_cols: usize) -> Self {
        Self {
            n_cols,
            indptr: vec![0],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Builds a matrix from per-row entry lists.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if any column is `>= n_cols`.
    pub fn from_rows<R>(n_cols: usize, rows: R) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = (usize, f32)>,
    {
        let mut m = Self::new(n_cols);
        for row in rows {
            m.push_row(row)?;
        }
        Ok(m)
    }

    /// Appends a row. Entries are sorted by column, duplicates are summed and
    /// explicit zeros are dropped.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if a column is `>= n_cols`.
    pub fn push_row<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (usize, f32)>,
    {
        let mut row: Vec<(usize, f32)> = entries.into_iter().collect();
        if let Some(&(col, _)) = row.iter().find(|(c, _)| *c >= self.n_cols) {
            return Err(FlyError::DimensionMismatch {
                expected: format!("column < {}", self.n_cols),
                actual: format!("column {col}"),
            });
        }
        row.sort_unstable_by_key(|&(c, _)| c);

        let mut last: Option<usize> = None;
        for (col, value) in row {
            if last == Some(col) {
                if let Some(v) = self.values.last_mut() {
                    *v += value;
                }
                continue;
            }
            self.indices.push(col);
            self.values.push(value);
            last = Some(col);
        }

        // drop zeros (including ones produced by summing duplicates)
        let start = self.indptr[self.indptr.len() - 1];
        let mut write = start;
        for read in start..self.indices.len() {
            if self.values[read] != 0.0 {
                self.indices[write] = self.indices[read];
                self.values[write] = self.values[read];
                write += 1;
            }
        }
        self.indices.truncate(write);
        self.values.truncate(write);
        self.indptr.push(write);
        Ok(())
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Total number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Returns a view of row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n_rows()`.
    #[must_use]
    pub fn row(&self, i: usize) -> SparseRow<'_> {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        SparseRow {
            indices: &self.indices[start..end],
            values: &self.values[start..end],
        }
    }

    /// Iterate over all rows in order.
    pub fn rows(&self) -> impl Iterator<Item = SparseRow<'_>> {
        (0..self.n_rows()).map(move |i| self.row(i))
    }

    /// Gets element at (row, col), zero if not stored.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        let r = self.row(row);
        r.indices
            .binary_search(&col)
            .map_or(0.0, |pos| r.values[pos])
    }

    /// Largest number of stored entries in any row.
    #[must_use]
    pub fn max_row_nnz(&self) -> usize {
        self.indptr.windows(2).map(|w| w[1] - w[0]).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_sorts_and_merges() {
        let mut m = SparseMatrix::new(5);
        m.push_row([(4, 1.0), (1, 2.0), (4, 0.5)]).unwrap();
        let row = m.row(0);
        assert_eq!(row.indices, &[1, 4]);
        assert_eq!(row.values, &[2.0, 1.5]);
    }

    #[test]
    fn test_push_row_drops_zeros() {
        let mut m = SparseMatrix::new(3);
        m.push_row([(0, 0.0), (1, 1.0), (2, 1.0), (2, -1.0)]).unwrap();
        assert_eq!(m.row(0).indices, &[1]);
        assert_eq!(m.nnz(), 1);
    }

    #[test]
    fn test_push_row_out_of_range() {
        let mut m = SparseMatrix::new(3);
        let err = m.push_row([(3, 1.0)]).unwrap_err();
        assert!(matches!(err, FlyError::DimensionMismatch { .. }));
        assert_eq!(m.n_rows(), 0);
    }

    #[test]
    fn test_from_rows_shape_and_get() {
        let m = SparseMatrix::from_rows(4, vec![vec![(0, 1.0)], vec![], vec![(2, 3.0), (3, 4.0)]])
            .unwrap();
        assert_eq!(m.shape(), (3, 4));
        assert_eq!(m.get(2, 3), 4.0);
        assert_eq!(m.get(1, 0), 0.0);
        assert_eq!(m.max_row_nnz(), 2);
        assert_eq!(m.rows().map(|r| r.nnz()).collect::<Vec<_>>(), vec![1, 0, 2]);
    }

    #[test]
    fn test_empty_matrix() {
        let m = SparseMatrix::new(10);
        assert_eq!(m.shape(), (0, 10));
        assert_eq!(m.max_row_nnz(), 0);
    }
}
