//! Wavefront aberrations of optical surfaces.
//!
//! Every aberration source produces an [`AberrationMap`]: a wavefront error in meter sampled on
//! the grid of the propagated field together with the pixels on which it is defined. The
//! [`Wavefront`](crate::wavefront::Wavefront) turns the map into a phase factor
//! `exp(+i 2 pi W / lambda)` after zeroing `W` outside the support.
use nalgebra::DMatrix;

use crate::{
    error::{PopError, PopResult},
    utils::griddata::SamplingGrid,
};

pub mod grid_sag;
#[cfg(feature = "psd")]
pub mod psd;
pub mod zernike;

pub use grid_sag::{GridSagSurface, SagSource};
#[cfg(feature = "psd")]
pub use psd::PsdSurface;
pub use zernike::{AngleOrigin, ZernikeBasis, ZernikeOrdering, ZernikeSurface};

/// Sampled wavefront error of a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct AberrationMap {
    wfe: DMatrix<f64>,
    support: DMatrix<bool>,
}

impl AberrationMap {
    /// Create a new map from a wavefront error (in meter) and its support.
    ///
    /// Values outside the support are set to zero.
    ///
    /// # Errors
    ///
    /// This function will return an error if the shapes of both matrices differ or the map
    /// contains non-finite values inside the support.
    pub fn new(mut wfe: DMatrix<f64>, support: DMatrix<bool>) -> PopResult<Self> {
        if wfe.shape() != support.shape() {
            return Err(PopError::Other(
                "wavefront error and support differ in shape".into(),
            ));
        }
        wfe.zip_apply(&support, |w, inside| {
            if !inside {
                *w = 0.0;
            }
        });
        if wfe.iter().any(|w| !w.is_finite()) {
            return Err(PopError::Degenerate(
                "wavefront error map contains non-finite values".into(),
            ));
        }
        Ok(Self { wfe, support })
    }
    /// Wavefront error in meter (zero outside the support).
    #[must_use]
    pub const fn wfe(&self) -> &DMatrix<f64> {
        &self.wfe
    }
    /// Pixels on which the wavefront error is defined.
    #[must_use]
    pub const fn support(&self) -> &DMatrix<bool> {
        &self.support
    }
    /// Peak-to-valley and RMS of the wavefront error over its support.
    #[must_use]
    pub fn statistics(&self) -> (f64, f64) {
        let values: Vec<f64> = self
            .wfe
            .iter()
            .zip(self.support.iter())
            .filter_map(|(w, s)| s.then_some(*w))
            .collect();
        if values.is_empty() {
            return (0.0, 0.0);
        }
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        let (mean, std) = crate::utils::math_utils::mean_and_std(values.iter().copied());
        (max - min, mean.hypot(std))
    }
}

/// Source of a wavefront error map.
pub trait Aberration {
    /// Sample the wavefront error on the given grid.
    ///
    /// `beam_radius` is the radius of the pilot beam at the surface (meter). It serves as
    /// default support radius for sources that do not declare their own.
    ///
    /// # Errors
    ///
    /// This function will return an error if the map cannot be computed on this grid (e.g.
    /// degenerate support, unreadable sag file).
    fn wavefront_error(&self, grid: &SamplingGrid, beam_radius: f64) -> PopResult<AberrationMap>;
}
