//! Linear classifiers over sparse hash codes.
//!
//! The search only needs one thing from a classifier: train on the hashed
//! training split, report a validation score in `[0, 1]`, and hand back a
//! serializable model. [`Classifier`] captures that contract;
//! [`SoftmaxRegression`] is the default multinomial logistic regression.
//!
//! # Example
//!
//! ```
//! use flyhash::classification::{Classifier, SoftmaxRegression};
//! use flyhash::primitives::SparseMatrix;
//!
//! let x = SparseMatrix::from_rows(3, vec![
//!     vec![(0, 1.0)],
//!     vec![(1, 1.0)],
//!     vec![(2, 1.0)],
//!     vec![(0, 1.0)],
//! ]).expect("columns in range");
//! let y = vec![0, 1, 2, 0];
//!
//! let (score, model) = SoftmaxRegression::new()
//!     .train(&x, &y, &x, &y, 10.0, 500)
//!     .expect("valid training data");
//! assert_eq!(score, 1.0);
//! assert_eq!(model.n_classes(), 3);
//! ```

use crate::error::{FlyError, Result};
use crate::primitives::SparseMatrix;
use serde::{Deserialize, Serialize};

/// Trains a model on hash codes and scores it on a validation split.
pub trait Classifier: Send + Sync {
    /// Fitted model type; persisted when it is the best seen.
    type Model: Serialize + Send;

    /// Train with inverse regularisation strength `c` for at most `num_iter`
    /// iterations; return `(validation_score, model)`.
    ///
    /// # Errors
    ///
    /// Returns an error on inconsistent inputs or numerical failure.
    fn train(
        &self,
        train: &SparseMatrix,
        train_labels: &[usize],
        val: &SparseMatrix,
        val_labels: &[usize],
        c: f64,
        num_iter: usize,
    ) -> Result<(f64, Self::Model)>;
}

/// Multinomial logistic regression trained by full-batch gradient descent.
///
/// Minimises `mean cross-entropy + ||W||² / (2·C·n)`. The step size is
/// `1 / L` with `L` the Lipschitz bound of the gradient, so no learning rate
/// has to be tuned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    tol: f64,
}

impl SoftmaxRegression {
    /// Creates a trainer with default tolerance (`1e-4`).
    #[must_use]
    pub fn new() -> Self {
        Self { tol: 1e-4 }
    }

    /// Sets the gradient tolerance for early stopping.
    #[must_use]
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Fit a model on `x`/`y` with `n_classes` output classes.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` for label/row count disagreement,
    /// `InvalidParameter` for empty data, out-of-range labels or `c <= 0`,
    /// and `ConvergenceFailure` if the loss stops being finite.
    pub fn fit(
        &self,
        x: &SparseMatrix,
        y: &[usize],
        n_classes: usize,
        c: f64,
        num_iter: usize,
    ) -> Result<SoftmaxModel> {
        let (n_samples, n_features) = x.shape();
        if n_samples != y.len() {
            return Err(FlyError::DimensionMismatch {
                expected: format!("{n_samples} labels"),
                actual: format!("{} labels", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(FlyError::invalid("n_samples", 0, "> 0"));
        }
        if !(c > 0.0 && c.is_finite()) {
            return Err(FlyError::invalid("C", c, "finite and > 0"));
        }
        if let Some(&bad) = y.iter().find(|&&label| label >= n_classes) {
            return Err(FlyError::invalid("label", bad, format!("< {n_classes}")));
        }

        let n = n_samples as f64;
        let lambda = 1.0 / (c * n);
        let max_sq_norm = x
            .rows()
            .map(|r| r.values.iter().map(|&v| f64::from(v).powi(2)).sum::<f64>())
            .fold(0.0, f64::max);
        // +1 for the intercept column
        let step = 1.0 / (0.5 * (max_sq_norm + 1.0) + lambda);

        let mut model = SoftmaxModel {
            n_features,
            n_classes,
            weights: vec![0.0; n_classes * n_features],
            intercepts: vec![0.0; n_classes],
        };
        let mut grad_w = vec![0.0; n_classes * n_features];
        let mut grad_b = vec![0.0; n_classes];
        let mut probs = vec![0.0; n_classes];

        for iteration in 0..num_iter {
            grad_w.iter_mut().for_each(|g| *g = 0.0);
            grad_b.iter_mut().for_each(|g| *g = 0.0);
            let mut loss = 0.0;

            for (row, &label) in x.rows().zip(y) {
                model.logits_into(row.indices, row.values, &mut probs);
                softmax_in_place(&mut probs);
                loss -= probs[label].max(f64::MIN_POSITIVE).ln();

                for (k, &p) in probs.iter().enumerate() {
                    let err = p - if k == label { 1.0 } else { 0.0 };
                    grad_b[k] += err;
                    let base = k * n_features;
                    for (&j, &v) in row.indices.iter().zip(row.values) {
                        grad_w[base + j] += err * f64::from(v);
                    }
                }
            }

            let sq_norm: f64 = model.weights.iter().map(|w| w * w).sum();
            loss = loss / n + 0.5 * lambda * sq_norm;
            if !loss.is_finite() {
                return Err(FlyError::ConvergenceFailure {
                    iterations: iteration + 1,
                    final_loss: loss,
                });
            }

            let mut max_grad: f64 = 0.0;
            for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                let g = g / n + lambda * *w;
                max_grad = max_grad.max(g.abs());
                *w -= step * g;
            }
            for (b, g) in model.intercepts.iter_mut().zip(&grad_b) {
                let g = g / n;
                max_grad = max_grad.max(g.abs());
                *b -= step * g;
            }

            if max_grad < self.tol {
                break;
            }
        }

        Ok(model)
    }
}

impl Default for SoftmaxRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for SoftmaxRegression {
    type Model = SoftmaxModel;

    fn train(
        &self,
        train: &SparseMatrix,
        train_labels: &[usize],
        val: &SparseMatrix,
        val_labels: &[usize],
        c: f64,
        num_iter: usize,
    ) -> Result<(f64, SoftmaxModel)> {
        if train.n_cols() != val.n_cols() {
            return Err(FlyError::DimensionMismatch {
                expected: format!("{} validation columns", train.n_cols()),
                actual: format!("{} validation columns", val.n_cols()),
            });
        }
        let n_classes = train_labels
            .iter()
            .chain(val_labels)
            .max()
            .map_or(0, |&m| m + 1);
        let model = self.fit(train, train_labels, n_classes, c, num_iter)?;
        let score = model.score(val, val_labels)?;
        Ok((score, model))
    }
}

/// A fitted multinomial logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxModel {
    n_features: usize,
    n_classes: usize,
    /// Row-major `n_classes × n_features`.
    weights: Vec<f64>,
    intercepts: Vec<f64>,
}

impl SoftmaxModel {
    /// Number of input features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn logits_into(&self, indices: &[usize], values: &[f32], out: &mut [f64]) {
        for (k, z) in out.iter_mut().enumerate() {
            let base = k * self.n_features;
            *z = self.intercepts[k]
                + indices
                    .iter()
                    .zip(values)
                    .map(|(&j, &v)| self.weights[base + j] * f64::from(v))
                    .sum::<f64>();
        }
    }

    fn check_features(&self, x: &SparseMatrix) -> Result<()> {
        if x.n_cols() != self.n_features {
            return Err(FlyError::DimensionMismatch {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.n_cols()),
            });
        }
        Ok(())
    }

    /// Class probabilities per sample.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `x` has the wrong number of columns.
    pub fn predict_proba(&self, x: &SparseMatrix) -> Result<Vec<Vec<f64>>> {
        self.check_features(x)?;
        Ok(x.rows()
            .map(|row| {
                let mut probs = vec![0.0; self.n_classes];
                self.logits_into(row.indices, row.values, &mut probs);
                softmax_in_place(&mut probs);
                probs
            })
            .collect())
    }

    /// Most likely class per sample; ties go to the lower class index.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `x` has the wrong number of columns.
    pub fn predict(&self, x: &SparseMatrix) -> Result<Vec<usize>> {
        self.check_features(x)?;
        let mut logits = vec![0.0; self.n_classes];
        Ok(x.rows()
            .map(|row| {
                self.logits_into(row.indices, row.values, &mut logits);
                argmax(&logits)
            })
            .collect())
    }

    /// Accuracy on `x`/`y`.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` on shape disagreement.
    pub fn score(&self, x: &SparseMatrix, y: &[usize]) -> Result<f64> {
        if x.n_rows() != y.len() {
            return Err(FlyError::DimensionMismatch {
                expected: format!("{} labels", x.n_rows()),
                actual: format!("{} labels", y.len()),
            });
        }
        if y.is_empty() {
            return Ok(0.0);
        }
        let predictions = self.predict(x)?;
        let correct = predictions.iter().zip(y).filter(|(p, t)| p == t).count();
        Ok(correct as f64 / y.len() as f64)
    }
}

fn softmax_in_place(z: &mut [f64]) {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for v in z.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in z.iter_mut() {
        *v /= sum;
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests;
