//! Flyhash: fruit-fly sparse binary hashing for text classification.
//!
//! A fly maps a document's weighted bag-of-tokens vector (the projection
//! neurons, `PN`) onto a much wider layer of Kenyon cells (`KC`) through a
//! sparse binary projection, then keeps only the most active cells
//! (winner-take-all). The resulting sparse binary hashes feed a linear
//! classifier, and a Bayesian search tunes the fly's shape for the best
//! validation accuracy.
//!
//! # Quick Start
//!
//! ```
//! use flyhash::prelude::*;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let fly = Fly::new(1000, 200, 5, 20, ProjectionStrategy::Uniform, &mut rng).unwrap();
//! assert_eq!(fly.projection().shape(), (200, 1000));
//!
//! let docs = SparseMatrix::from_rows(1000, vec![vec![(3, 2.0), (42, 1.5), (900, 0.5)]]).unwrap();
//! let hashes = FlyHashEncoder
//!     .encode(&docs, fly.projection(), fly.wta_percent(), 400)
//!     .unwrap();
//! assert_eq!(hashes.shape(), (1, 200));
//! ```
//!
//! # Modules
//!
//! - [`projection`]: Sparse binary projection matrices (four strategies)
//! - [`fly`]: A projection plus its winner-take-all setting
//! - [`encode`]: PN vectors → binary KC hashes
//! - [`classification`]: Linear classifier trained on the hashes
//! - [`data`]: Vocabulary and corpus loading
//! - [`trial`]: Parallel evaluation of one hyperparameter point
//! - [`automl`]: Bayesian search with resumable observation logs
//! - [`config`]: Search configuration and run paths

pub mod automl;
pub mod classification;
pub mod config;
pub mod data;
pub mod encode;
pub mod error;
pub mod fly;
pub mod prelude;
pub mod primitives;
pub mod projection;
pub mod trial;

pub use error::{FlyError, Result};
pub use primitives::SparseMatrix;
