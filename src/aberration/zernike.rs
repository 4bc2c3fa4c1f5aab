#![warn(missing_docs)]
//! Zernike polynomials on circular and elliptical pupils.
//!
//! Polynomials are addressed by a zero based index `j` in one of the supported
//! [orderings](ZernikeOrdering). The radial part is evaluated through the Jacobi polynomial
//! `R_n^m(rho) = (-1)^k rho^m P_k^(m,0)(1 - 2 rho^2)` with `k = (n - m)/2`. On request the
//! polynomials are orthonormalized over an arbitrary pupil mask (modified Gram-Schmidt with
//! the pupil average as inner product).
use itertools::Itertools;
use log::debug;
use nalgebra::DMatrix;
use num::Zero;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use strum_macros::EnumIter;
use uom::si::{f64::Length, length::meter};

use super::{Aberration, AberrationMap};
use crate::{
    aperture::Aperture,
    error::{PopError, PopResult},
    utils::{griddata::SamplingGrid, math_utils::kahan_sum, usize_to_f64},
};

/// Ordering convention of the Zernike index `j`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ZernikeOrdering {
    /// ANSI Z80.28 / OSA
    #[default]
    Ansi,
    /// as ANSI but with the opposite sign of the azimuthal number (Born & Wolf)
    Standard,
    /// Noll, "Zernike Standard Coefficients"
    Noll,
    /// Fringe / University of Arizona
    Fringe,
}

/// Origin of the azimuthal angle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AngleOrigin {
    /// counter-clockwise positive from the x axis
    #[default]
    X,
    /// clockwise positive from the y axis
    Y,
}

/// Average of `values` over the pixels marked in `support`.
fn pupil_mean(support: &DMatrix<bool>, values: impl Iterator<Item = f64>) -> f64 {
    let mut count = 0_usize;
    let sum = kahan_sum(
        values
            .zip(support.iter())
            .filter(|(_, inside)| **inside)
            .map(|(v, _)| {
                count += 1;
                v
            }),
    );
    if count == 0 {
        0.0
    } else {
        sum / usize_to_f64(count)
    }
}

fn triangular(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Convert the (zero based) index `j` into the azimuthal number `m` and the radial number `n`.
#[must_use]
pub fn j_to_mn(j: usize, ordering: ZernikeOrdering) -> (i64, usize) {
    #[allow(clippy::cast_possible_wrap)]
    let signed = |v: usize| v as i64;
    match ordering {
        ZernikeOrdering::Ansi | ZernikeOrdering::Standard => {
            let mut n = 0;
            while triangular(n + 1) <= j {
                n += 1;
            }
            let m = 2 * signed(j) - signed(n * (n + 2));
            if ordering == ZernikeOrdering::Ansi {
                (m, n)
            } else {
                (-m, n)
            }
        }
        ZernikeOrdering::Noll => {
            let index = j + 1;
            let mut n = 0;
            while triangular(n + 1) < index {
                n += 1;
            }
            let cn = triangular(n) + 1;
            let m = if n % 2 == 0 {
                (index - cn + 1) / 2 * 2
            } else {
                (index - cn) / 2 * 2 + 1
            };
            if index % 2 == 1 {
                (-signed(m), n)
            } else {
                (signed(m), n)
            }
        }
        ZernikeOrdering::Fringe => {
            let index = j + 1;
            let mut s = 1;
            while s * s < index {
                s += 1;
            }
            let m_n = 2 * (s - 1);
            let g_s = (s - 1) * (s - 1) + 1;
            let n = (s - 1) + (index - g_s) / 2;
            let m = signed(m_n) - signed(n);
            if (index - g_s) % 2 == 1 {
                (-m, n)
            } else {
                (m, n)
            }
        }
    }
}

/// Convert azimuthal number `m` and radial number `n` into the (zero based) index `j`.
///
/// # Errors
///
/// This function will return an error if `|m| > n` or `n - |m|` is odd.
pub fn mn_to_j(m: i64, n: usize, ordering: ZernikeOrdering) -> PopResult<usize> {
    let abs_m = usize::try_from(m.unsigned_abs())
        .map_err(|_| PopError::Configuration("azimuthal number out of range".into()))?;
    if abs_m > n || (n - abs_m) % 2 != 0 {
        return Err(PopError::Configuration(format!(
            "invalid Zernike numbers (m={m}, n={n})"
        )));
    }
    let j = match ordering {
        ZernikeOrdering::Ansi | ZernikeOrdering::Standard => {
            let m = if ordering == ZernikeOrdering::Ansi {
                m
            } else {
                -m
            };
            let twice = i64::try_from(n * (n + 2))
                .map_err(|_| PopError::Configuration("radial number out of range".into()))?
                + m;
            usize::try_from(twice / 2)
                .map_err(|_| PopError::Configuration("invalid Zernike numbers".into()))?
        }
        ZernikeOrdering::Noll => {
            let p = match (n % 4, m.signum()) {
                (0 | 1, 1) | (2 | 3, -1) => 0,
                _ => 1,
            };
            triangular(n) + abs_m + p - 1
        }
        ZernikeOrdering::Fringe => {
            let a = (1 + (n + abs_m) / 2).pow(2);
            let c = usize::from(m >= 0);
            a - 2 * abs_m - c
        }
    };
    Ok(j)
}

/// Jacobi polynomial `P_k^(alpha, 0)(x)` by its three term recurrence.
fn jacobi(k: usize, alpha: usize, x: f64) -> f64 {
    let a = usize_to_f64(alpha);
    let mut p_prev = 1.0;
    if k == 0 {
        return p_prev;
    }
    let mut p = 0.5f64.mul_add((a + 2.0) * (x - 1.0), a + 1.0);
    for i in 2..=k {
        let n = usize_to_f64(i);
        let c1 = 2.0 * n * (n + a) * 2.0f64.mul_add(n, a - 2.0);
        let c2 = 2.0f64.mul_add(n, a - 1.0)
            * (2.0f64.mul_add(n, a) * 2.0f64.mul_add(n, a - 2.0)).mul_add(x, a * a);
        let c3 = 2.0 * (n + a - 1.0) * (n - 1.0) * 2.0f64.mul_add(n, a);
        let next = c2.mul_add(p, -c3 * p_prev) / c1;
        p_prev = p;
        p = next;
    }
    p
}

/// Radial Zernike polynomial `R_n^m(rho)`.
#[must_use]
pub fn radial(m: i64, n: usize, rho: f64) -> f64 {
    let Ok(abs_m) = usize::try_from(m.unsigned_abs()) else {
        return 0.0;
    };
    if abs_m > n || (n - abs_m) % 2 != 0 {
        return 0.0;
    }
    let k = (n - abs_m) / 2;
    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
    let exponent = i32::try_from(abs_m).unwrap_or(i32::MAX);
    sign * rho.powi(exponent) * jacobi(k, abs_m, 2.0f64.mul_add(-rho * rho, 1.0))
}

/// A set of Zernike polynomials sampled on a grid.
#[derive(Debug, Clone)]
pub struct ZernikeBasis {
    modes: Vec<(i64, usize)>,
    polynomials: Vec<DMatrix<f64>>,
    support: DMatrix<bool>,
}

impl ZernikeBasis {
    /// Sample the polynomials with the given indices on normalized polar coordinates.
    ///
    /// Points with `rho > 1` lie outside the support and are set to zero. With `normalize` the
    /// polynomials have unit RMS over the unit circle, otherwise unit amplitude at `rho = 1`.
    ///
    /// # Errors
    ///
    /// This function will return an error if no index is given or if `rho` and `phi` differ in shape.
    pub fn new(
        indices: &[usize],
        ordering: ZernikeOrdering,
        normalize: bool,
        rho: &DMatrix<f64>,
        phi: &DMatrix<f64>,
    ) -> PopResult<Self> {
        if indices.is_empty() {
            return Err(PopError::Configuration("no Zernike index given".into()));
        }
        if rho.shape() != phi.shape() {
            return Err(PopError::Other(
                "radial and azimuthal coordinates differ in shape".into(),
            ));
        }
        let support = rho.map(|r| r <= 1.0);
        let modes: Vec<(i64, usize)> = indices.iter().map(|j| j_to_mn(*j, ordering)).collect();
        let polynomials = modes
            .iter()
            .map(|(m, n)| {
                let norm = if normalize {
                    if *m == 0 {
                        usize_to_f64(n + 1).sqrt()
                    } else {
                        (2.0 * usize_to_f64(n + 1)).sqrt()
                    }
                } else {
                    1.0
                };
                #[allow(clippy::cast_precision_loss)]
                let m_f = m.unsigned_abs() as f64;
                DMatrix::from_fn(rho.nrows(), rho.ncols(), |r, c| {
                    let rho_v = rho[(r, c)];
                    if rho_v > 1.0 {
                        return 0.0;
                    }
                    let azimuthal = match m.signum() {
                        1 => (m_f * phi[(r, c)]).cos(),
                        -1 => (m_f * phi[(r, c)]).sin(),
                        _ => 1.0,
                    };
                    norm * radial(*m, *n, rho_v) * azimuthal
                })
            })
            .collect();
        Ok(Self {
            modes,
            polynomials,
            support,
        })
    }
    /// `(m, n)` of all polynomials of this basis.
    #[must_use]
    pub fn modes(&self) -> &[(i64, usize)] {
        &self.modes
    }
    /// Returns the number of polynomials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.polynomials.len()
    }
    /// Returns `true` if the basis contains no polynomial.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polynomials.is_empty()
    }
    /// The k-th polynomial of this basis.
    #[must_use]
    pub fn polynomial(&self, k: usize) -> Option<&DMatrix<f64>> {
        self.polynomials.get(k)
    }
    /// Support of the basis (pixels where the polynomials are defined).
    #[must_use]
    pub const fn support(&self) -> &DMatrix<bool> {
        &self.support
    }
    /// Orthonormalize the polynomials over the given pupil mask.
    ///
    /// The support of the basis is restricted to the mask. The resulting polynomials are
    /// orthonormal with respect to the average over the pupil, i.e. each has unit RMS and they are
    /// mutually uncorrelated.
    ///
    /// # Errors
    ///
    /// This function will return an error if the mask shape does not match, the mask is empty or
    /// the polynomials are linearly dependent on the mask.
    pub fn orthonormalize(&mut self, mask: &DMatrix<bool>) -> PopResult<()> {
        if mask.shape() != self.support.shape() {
            return Err(PopError::Other(
                "pupil mask does not match the grid".into(),
            ));
        }
        self.support = self.support.zip_map(mask, |a, b| a && b);
        if !self.support.iter().any(|v| *v) {
            return Err(PopError::Degenerate(
                "pupil mask for orthonormalization is empty".into(),
            ));
        }
        let support = self.support.clone();
        for p in &mut self.polynomials {
            p.zip_apply(&support, |v, inside| {
                if !inside {
                    *v = 0.0;
                }
            });
        }
        for k in 0..self.polynomials.len() {
            let (done, rest) = self.polynomials.split_at_mut(k);
            let current = &mut rest[0];
            for basis in done.iter() {
                let projection = pupil_mean(
                    &support,
                    current.iter().zip(basis.iter()).map(|(a, b)| a * b),
                );
                current.zip_apply(basis, |v, b| *v -= projection * b);
            }
            let norm = pupil_mean(&support, current.iter().map(|v| v * v)).sqrt();
            if norm < 1e-12 {
                return Err(PopError::Degenerate(format!(
                    "Zernike polynomial #{k} is linearly dependent on the pupil mask"
                )));
            }
            current.apply(|v| *v /= norm);
        }
        Ok(())
    }
    /// Covariance matrix `M[i, j] = <Z_i Z_j>` over the support.
    ///
    /// For a map `W = sum c_k Z_k` the pupil RMS is `sqrt(c^T M c)`. Entries below `1e-10` are
    /// set to zero.
    #[must_use]
    pub fn cov(&self) -> DMatrix<f64> {
        let n = self.polynomials.len();
        let mut cov = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            for j in i..n {
                let value = pupil_mean(
                    &self.support,
                    self.polynomials[i]
                        .iter()
                        .zip(self.polynomials[j].iter())
                        .map(|(a, b)| a * b),
                );
                let value = if value < 1e-10 { 0.0 } else { value };
                cov[(i, j)] = value;
                cov[(j, i)] = value;
            }
        }
        cov
    }
    /// Linear combination `sum c_k Z_k` of the polynomials.
    ///
    /// # Errors
    ///
    /// This function will return an error if the number of coefficients does not match the basis.
    pub fn combine(&self, coefficients: &[f64]) -> PopResult<DMatrix<f64>> {
        if coefficients.len() != self.polynomials.len() {
            return Err(PopError::Configuration(format!(
                "{} coefficients given for {} Zernike polynomials",
                coefficients.len(),
                self.polynomials.len()
            )));
        }
        let (nrows, ncols) = self.support.shape();
        let mut sum = DMatrix::<f64>::zeros(nrows, ncols);
        for (p, c) in self.polynomials.iter().zip(coefficients) {
            sum.zip_apply(p, |s, v| *s += c * v);
        }
        sum.zip_apply(&self.support, |s, inside| {
            if !inside {
                *s = 0.0;
            }
        });
        Ok(sum)
    }
}

fn unit_length() -> Length {
    Length::new::<meter>(1.0)
}

/// Zernike wavefront error of a surface.
///
/// The wavefront error is `sum c_k Z_k * unit` (in meter). The polynomials are defined over an
/// ellipse with the given semi axes (or, if omitted, over a circle with the radius of the pilot
/// beam at the surface).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZernikeSurface {
    indices: Vec<usize>,
    coefficients: Vec<f64>,
    #[serde(default = "unit_length")]
    unit: Length,
    #[serde(default)]
    ordering: ZernikeOrdering,
    #[serde(default)]
    normalize: bool,
    #[serde(default)]
    semi_axes: Option<(Length, Length)>,
    #[serde(default)]
    origin: AngleOrigin,
    /// angular offset (degrees)
    #[serde(default)]
    offset: f64,
    #[serde(default)]
    orthonormal: bool,
    #[serde(default)]
    mask: Option<Aperture>,
}

impl ZernikeSurface {
    /// Create a new Zernike surface from indices and coefficients (in meter).
    ///
    /// # Errors
    ///
    /// This function will return an error if the index / coefficient lists are malformed (see
    /// [`ZernikeSurface::validate`]).
    pub fn new(
        indices: Vec<usize>,
        coefficients: Vec<f64>,
        ordering: ZernikeOrdering,
    ) -> PopResult<Self> {
        let surface = Self {
            indices,
            coefficients,
            unit: unit_length(),
            ordering,
            normalize: false,
            semi_axes: None,
            origin: AngleOrigin::X,
            offset: 0.0,
            orthonormal: false,
            mask: None,
        };
        surface.validate()?;
        Ok(surface)
    }
    /// Check the consistency of the parameters.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///  - the index list is empty, contains duplicates or differs in length from the coefficient list
    ///  - a coefficient, the unit or the offset is not finite
    ///  - given semi axes are not positive
    pub fn validate(&self) -> PopResult<()> {
        if self.indices.is_empty() {
            return Err(PopError::Configuration("empty Zernike index list".into()));
        }
        if self.indices.len() != self.coefficients.len() {
            return Err(PopError::Configuration(format!(
                "{} Zernike indices but {} coefficients",
                self.indices.len(),
                self.coefficients.len()
            )));
        }
        if !self.indices.iter().all_unique() {
            return Err(PopError::Configuration(
                "duplicate Zernike index".into(),
            ));
        }
        if self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PopError::Configuration(
                "Zernike coefficients must be finite".into(),
            ));
        }
        if !self.unit.is_finite() || !self.offset.is_finite() {
            return Err(PopError::Configuration(
                "Zernike unit and offset must be finite".into(),
            ));
        }
        if let Some((rx, ry)) = self.semi_axes {
            if !(rx.is_normal() && rx.is_sign_positive() && ry.is_normal() && ry.is_sign_positive()) {
                return Err(PopError::Configuration(
                    "Zernike semi axes must be positive".into(),
                ));
            }
        }
        Ok(())
    }
    /// Set the unit of the coefficients (e.g. a wavelength for coefficients given in waves).
    ///
    /// # Errors
    ///
    /// This function will return an error if the unit is not finite.
    pub fn with_unit(mut self, unit: Length) -> PopResult<Self> {
        self.unit = unit;
        self.validate()?;
        Ok(self)
    }
    /// Normalize the polynomials to unit RMS.
    #[must_use]
    pub const fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }
    /// Use an elliptical support with the given semi axes instead of the pilot beam radius.
    ///
    /// # Errors
    ///
    /// This function will return an error if the semi axes are not positive.
    pub fn with_semi_axes(mut self, rx: Length, ry: Length) -> PopResult<Self> {
        self.semi_axes = Some((rx, ry));
        self.validate()?;
        Ok(self)
    }
    /// Set the origin and offset (degrees) of the azimuthal angle.
    ///
    /// # Errors
    ///
    /// This function will return an error if the offset is not finite.
    pub fn with_orientation(mut self, origin: AngleOrigin, offset: f64) -> PopResult<Self> {
        self.origin = origin;
        self.offset = offset;
        self.validate()?;
        Ok(self)
    }
    /// Orthonormalize the polynomials over their support, optionally restricted by a pupil mask.
    #[must_use]
    pub fn with_orthonormalization(mut self, mask: Option<Aperture>) -> Self {
        self.orthonormal = true;
        self.mask = mask;
        self
    }
    /// Returns the Zernike indices.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
    /// Returns the coefficients (in units of [`ZernikeSurface::unit`]).
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
    /// Returns the unit of the coefficients.
    #[must_use]
    pub const fn unit(&self) -> Length {
        self.unit
    }
    /// Returns the ordering convention.
    #[must_use]
    pub const fn ordering(&self) -> ZernikeOrdering {
        self.ordering
    }
    /// Returns `true` if all coefficients are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.coefficients.iter().all(Zero::is_zero)
    }
    /// Normalized polar coordinates of the grid pixels.
    fn polar_coordinates(
        &self,
        grid: &SamplingGrid,
        beam_radius: f64,
    ) -> PopResult<(DMatrix<f64>, DMatrix<f64>)> {
        let (rx, ry) = self.semi_axes.map_or((beam_radius, beam_radius), |(rx, ry)| {
            (rx.get::<meter>(), ry.get::<meter>())
        });
        if !(rx.is_normal() && rx > 0.0 && ry.is_normal() && ry > 0.0) {
            return Err(PopError::Degenerate(
                "Zernike support radius must be positive".into(),
            ));
        }
        let (xx, yy) = grid.meshgrid()?;
        let u = xx / rx;
        let v = yy / ry;
        let rho = u.zip_map(&v, f64::hypot);
        let offset = self.offset.to_radians();
        let phi = match self.origin {
            AngleOrigin::X => u.zip_map(&v, |x, y| y.atan2(x) + offset),
            AngleOrigin::Y => u.zip_map(&v, |x, y| x.atan2(y) + offset),
        };
        Ok((rho, phi))
    }
    /// Sample the polynomials of this surface on the grid.
    ///
    /// For orthonormal polynomials the complete sequence from the piston up to the largest
    /// requested index is orthonormalized, so that every non-piston term has zero mean over the
    /// pupil.
    ///
    /// # Errors
    ///
    /// This function will return an error if the support radius is degenerate or the
    /// orthonormalization fails.
    pub fn basis(&self, grid: &SamplingGrid, beam_radius: f64) -> PopResult<ZernikeBasis> {
        let (rho, phi) = self.polar_coordinates(grid, beam_radius)?;
        if !self.orthonormal {
            return ZernikeBasis::new(&self.indices, self.ordering, self.normalize, &rho, &phi);
        }
        let max_index = self.indices.iter().copied().max().unwrap_or(0);
        let sequence: Vec<usize> = (0..=max_index).collect();
        let mut full = ZernikeBasis::new(&sequence, self.ordering, self.normalize, &rho, &phi)?;
        let mask = self
            .mask
            .as_ref()
            .map_or_else(|| full.support().clone(), |m| m.support(grid));
        full.orthonormalize(&mask)?;
        let polynomials = self
            .indices
            .iter()
            .map(|j| full.polynomials[*j].clone())
            .collect();
        let modes = self.indices.iter().map(|j| full.modes[*j]).collect();
        Ok(ZernikeBasis {
            modes,
            polynomials,
            support: full.support,
        })
    }
}

impl Aberration for ZernikeSurface {
    fn wavefront_error(&self, grid: &SamplingGrid, beam_radius: f64) -> PopResult<AberrationMap> {
        let basis = self.basis(grid, beam_radius)?;
        let unit = self.unit.get::<meter>();
        let coefficients: Vec<f64> = self.coefficients.iter().map(|c| c * unit).collect();
        let wfe = basis.combine(&coefficients)?;
        debug!(
            "Zernike surface: {} polynomials ({} ordering), peak wfe {:.3e} m",
            basis.len(),
            self.ordering,
            wfe.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
        );
        AberrationMap::new(wfe, basis.support)
    }
}

impl Default for ZernikeSurface {
    fn default() -> Self {
        Self {
            indices: vec![0],
            coefficients: vec![0.0],
            unit: unit_length(),
            ordering: ZernikeOrdering::default(),
            normalize: false,
            semi_axes: None,
            origin: AngleOrigin::default(),
            offset: 0.0,
            orthonormal: false,
            mask: None,
        }
    }
}
