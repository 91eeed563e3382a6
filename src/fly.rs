//! A single randomly constructed hash instance ("fly").

use crate::error::{FlyError, Result};
use crate::projection::{ProjectionMatrix, ProjectionStrategy};
use rand::Rng;

/// Winner-take-all percentage for `num_nonzero` winners out of `kc_size` units.
///
/// ```
/// assert_eq!(flyhash::fly::wta_percent(300, 1000), 30.0);
/// ```
#[must_use]
pub fn wta_percent(num_nonzero: usize, kc_size: usize) -> f64 {
    num_nonzero as f64 / kc_size as f64 * 100.0
}

/// One trial instance: a projection plus its sparsification settings.
#[derive(Debug, Clone)]
pub struct Fly {
    projection: ProjectionMatrix,
    wta_percent: f64,
    kc_score: f64,
    is_evaluated: bool,
}

impl Fly {
    /// Build a fly with a fresh random projection.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `num_nonzero` is zero or the projection
    /// sizes are invalid.
    pub fn new<R: Rng + ?Sized>(
        pn_size: usize,
        kc_size: usize,
        proj_size: usize,
        num_nonzero: usize,
        strategy: ProjectionStrategy,
        rng: &mut R,
    ) -> Result<Self> {
        if num_nonzero == 0 {
            return Err(FlyError::invalid("num_nonzero", num_nonzero, "> 0"));
        }
        let projection = ProjectionMatrix::build(pn_size, kc_size, proj_size, strategy, rng)?;
        Ok(Self::with_projection(projection, num_nonzero))
    }

    /// Wrap an existing projection.
    #[must_use]
    pub fn with_projection(projection: ProjectionMatrix, num_nonzero: usize) -> Self {
        let kc_size = projection.kc_size();
        let wta = wta_percent(num_nonzero, kc_size);
        let winners = (kc_size as f64 * wta / 100.0).floor();
        Self {
            projection,
            wta_percent: wta,
            kc_score: 1.0 / winners.log10(),
            is_evaluated: false,
        }
    }

    /// The projection matrix.
    #[must_use]
    pub fn projection(&self) -> &ProjectionMatrix {
        &self.projection
    }

    /// Percentage of hidden units kept by winner-take-all.
    #[must_use]
    pub fn wta_percent(&self) -> f64 {
        self.wta_percent
    }

    /// `1 / log10(winners)`. Computed for diagnostics; not used for selection.
    #[must_use]
    pub fn kc_score(&self) -> f64 {
        self.kc_score
    }

    /// See [`ProjectionMatrix::vocabulary_coverage`].
    #[must_use]
    pub fn vocabulary_coverage(&self) -> f64 {
        self.projection.vocabulary_coverage()
    }

    /// Whether a score has been computed for this fly.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.is_evaluated
    }

    pub(crate) fn mark_evaluated(&mut self) {
        self.is_evaluated = true;
    }
}
