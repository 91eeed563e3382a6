//! Core compute primitives.
//!
//! Document-term matrices and hash codes are overwhelmingly zero, so every
//! matrix in the pipeline is stored row-sparse.

mod sparse;

pub use sparse::{SparseMatrix, SparseRow};
