#![warn(missing_docs)]
//! Paraxial ray-transfer (ABCD) matrices.
//!
//! A surface of the optical chain is described (per transverse axis) by the composite matrix
//! `T·D·M` of a magnification `M`, a refracting / reflecting dioptre (or thin lens) `D` and a
//! translation `T` to the next surface. The reverse operation ([`Abcd::decompose`]) recovers
//! these physical primitives from an arbitrary matrix, which is what the wavefront engine needs.
use std::{fmt::Display, ops::Mul};

use crate::error::{PopError, PopResult};
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// Paraxial ray vector `(position, slope)`.
pub type RayVector = Vector2<f64>;

/// A 2x2 ray-transfer matrix together with the sign of the refractive index on its
/// input (`cin`) and output (`cout`) side.
///
/// The sign tracks the propagation direction, which flips after each mirror.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Abcd {
    matrix: Matrix2<f64>,
    cin: f64,
    cout: f64,
}

/// The physical primitives an [`Abcd`] matrix decomposes into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbcdPrimitives {
    /// thickness of the translation `B/D`
    pub thickness: f64,
    /// magnification `(AD-BC)/D`
    pub magnification: f64,
    /// index ratio `n1/n2` of the dioptre
    pub n1n2: f64,
    /// optical power of the dioptre `-C/M`
    pub power: f64,
}

impl Default for Abcd {
    /// Identity matrix with positive input and output index signs.
    fn default() -> Self {
        Self {
            matrix: Matrix2::identity(),
            cin: 1.0,
            cout: 1.0,
        }
    }
}

impl Abcd {
    /// Create a composite matrix `T·D·M` from a thickness, the curvature of a dioptre between
    /// the media `n1` and `n2` and a magnification.
    ///
    /// If both refractive indices are equal, the curvature is interpreted as the power of a
    /// thin lens (`1/f`). The signs of `n1` and `n2` determine [`Abcd::cin`] and [`Abcd::cout`].
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///  - one of the refractive indices is zero or not finite
    ///  - the thickness or curvature is not finite
    ///  - the magnification is zero or not finite
    pub fn new(
        thickness: f64,
        curvature: f64,
        n1: f64,
        n2: f64,
        magnification: f64,
    ) -> PopResult<Self> {
        let translation = Self::translation(thickness)?;
        let dioptre = Self::dioptre(curvature, n1, n2)?;
        let magnifier = Self::magnifier(magnification)?;
        Ok(translation * dioptre * magnifier)
    }
    /// Create a free-space translation `[[1, t], [0, 1]]`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the thickness is not finite.
    pub fn translation(thickness: f64) -> PopResult<Self> {
        if !thickness.is_finite() {
            return Err(PopError::Configuration(
                "thickness must be finite".into(),
            ));
        }
        Ok(Self {
            matrix: Matrix2::new(1.0, thickness, 0.0, 1.0),
            ..Self::default()
        })
    }
    /// Create a refracting (or reflecting, if `n2 = -n1`) spherical surface of the given curvature.
    ///
    /// For `n1 == n2` the matrix of a thin lens of power `curvature` is returned.
    ///
    /// # Errors
    ///
    /// This function will return an error if one of the indices is zero or not finite or if the
    /// curvature is not finite.
    pub fn dioptre(curvature: f64, n1: f64, n2: f64) -> PopResult<Self> {
        if !n1.is_normal() || !n2.is_normal() {
            return Err(PopError::Configuration(
                "refractive indices must be finite and non-zero".into(),
            ));
        }
        if !curvature.is_finite() {
            return Err(PopError::Configuration(
                "curvature must be finite".into(),
            ));
        }
        #[allow(clippy::float_cmp)]
        let matrix = if n1 == n2 {
            Matrix2::new(1.0, 0.0, -curvature, 1.0)
        } else {
            let ratio = n1 / n2;
            Matrix2::new(1.0, 0.0, -(1.0 - ratio) * curvature, ratio)
        };
        Ok(Self {
            matrix,
            cin: n1.signum(),
            cout: n2.signum(),
        })
    }
    /// Create a thin lens of the given focal length.
    ///
    /// # Errors
    ///
    /// This function will return an error if the focal length is zero or not finite.
    pub fn thin_lens(focal_length: f64) -> PopResult<Self> {
        if focal_length == 0.0 || !focal_length.is_finite() {
            return Err(PopError::Configuration(
                "focal length must be finite and non-zero".into(),
            ));
        }
        Self::dioptre(1.0 / focal_length, 1.0, 1.0)
    }
    /// Create a magnification `[[m, 0], [0, 1/m]]`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the magnification is zero or not finite.
    pub fn magnifier(magnification: f64) -> PopResult<Self> {
        if !magnification.is_normal() {
            return Err(PopError::Configuration(
                "magnification must be finite and non-zero".into(),
            ));
        }
        Ok(Self {
            matrix: Matrix2::new(magnification, 0.0, 0.0, 1.0 / magnification),
            ..Self::default()
        })
    }
    /// Create a matrix from its explicit elements with positive index signs.
    ///
    /// # Errors
    ///
    /// This function will return an error if one of the elements is not finite.
    pub fn from_elements(a: f64, b: f64, c: f64, d: f64) -> PopResult<Self> {
        if [a, b, c, d].iter().any(|e| !e.is_finite()) {
            return Err(PopError::Configuration(
                "ABCD elements must be finite".into(),
            ));
        }
        Ok(Self {
            matrix: Matrix2::new(a, b, c, d),
            ..Self::default()
        })
    }
    /// Return a copy of this matrix with different index signs.
    #[must_use]
    pub fn with_signs(mut self, cin: f64, cout: f64) -> Self {
        self.cin = if cin.is_sign_negative() { -1.0 } else { 1.0 };
        self.cout = if cout.is_sign_negative() { -1.0 } else { 1.0 };
        self
    }
    /// Returns the A element.
    #[must_use]
    pub fn a(&self) -> f64 {
        self.matrix[(0, 0)]
    }
    /// Returns the B element.
    #[must_use]
    pub fn b(&self) -> f64 {
        self.matrix[(0, 1)]
    }
    /// Returns the C element.
    #[must_use]
    pub fn c(&self) -> f64 {
        self.matrix[(1, 0)]
    }
    /// Returns the D element.
    #[must_use]
    pub fn d(&self) -> f64 {
        self.matrix[(1, 1)]
    }
    /// Returns the underlying 2x2 matrix.
    #[must_use]
    pub const fn matrix(&self) -> &Matrix2<f64> {
        &self.matrix
    }
    /// Returns the sign of the refractive index on the input side.
    #[must_use]
    pub const fn cin(&self) -> f64 {
        self.cin
    }
    /// Returns the sign of the refractive index on the output side.
    #[must_use]
    pub const fn cout(&self) -> f64 {
        self.cout
    }
    /// Returns the determinant `AD-BC` (which equals `n1/n2` for a single surface).
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.matrix.determinant()
    }
    /// Returns the inverse matrix (with swapped index signs).
    ///
    /// # Errors
    ///
    /// This function will return an error if the matrix is singular.
    pub fn inverse(&self) -> PopResult<Self> {
        let matrix = self
            .matrix
            .try_inverse()
            .ok_or_else(|| PopError::Degenerate("singular ABCD matrix".into()))?;
        Ok(Self {
            matrix,
            cin: self.cout,
            cout: self.cin,
        })
    }
    fn checked_d(&self) -> PopResult<f64> {
        let d = self.d();
        if d == 0.0 {
            Err(PopError::Degenerate(
                "ABCD matrix with D=0 cannot be decomposed".into(),
            ))
        } else {
            Ok(d)
        }
    }
    /// Thickness `B/D` of the translation part.
    ///
    /// # Errors
    ///
    /// This function will return an error if `D` is zero.
    pub fn thickness(&self) -> PopResult<f64> {
        Ok(self.b() / self.checked_d()?)
    }
    /// Magnification `(AD-BC)/D`.
    ///
    /// # Errors
    ///
    /// This function will return an error if `D` is zero or the resulting magnification vanishes.
    pub fn magnification(&self) -> PopResult<f64> {
        let m = self.determinant() / self.checked_d()?;
        if m == 0.0 {
            Err(PopError::Degenerate(
                "ABCD matrix has zero magnification".into(),
            ))
        } else {
            Ok(m)
        }
    }
    /// Index ratio `n1/n2` (`D·M`).
    ///
    /// # Errors
    ///
    /// see [`Abcd::magnification`]
    pub fn n1n2(&self) -> PopResult<f64> {
        Ok(self.d() * self.magnification()?)
    }
    /// Optical power of the dioptre part (`-C/M`).
    ///
    /// # Errors
    ///
    /// see [`Abcd::magnification`]
    pub fn power(&self) -> PopResult<f64> {
        Ok(-self.c() / self.magnification()?)
    }
    /// Effective focal length `1/(power·M)`. Infinite for a system without power.
    ///
    /// # Errors
    ///
    /// see [`Abcd::magnification`]
    pub fn focal_length(&self) -> PopResult<f64> {
        let m = self.magnification()?;
        Ok(1.0 / (-self.c() / m * m))
    }
    /// Decompose this matrix into thickness, magnification, index ratio and power.
    ///
    /// # Errors
    ///
    /// This function will return an error if `D` or the magnification is zero.
    pub fn decompose(&self) -> PopResult<AbcdPrimitives> {
        let magnification = self.magnification()?;
        Ok(AbcdPrimitives {
            thickness: self.thickness()?,
            magnification,
            n1n2: self.d() * magnification,
            power: -self.c() / magnification,
        })
    }
    /// Apply this matrix to a ray vector.
    #[must_use]
    pub fn apply(&self, ray: &RayVector) -> RayVector {
        self.matrix * ray
    }
}

impl Mul for Abcd {
    type Output = Self;
    /// `self · rhs`: `rhs` acts first, so the input sign is taken from `rhs` and the output
    /// sign from `self`.
    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            matrix: self.matrix * rhs.matrix,
            cin: rhs.cin,
            cout: self.cout,
        }
    }
}

impl Mul<RayVector> for Abcd {
    type Output = RayVector;
    fn mul(self, rhs: RayVector) -> Self::Output {
        self.apply(&rhs)
    }
}

impl Display for Abcd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[[{:.6e}, {:.6e}], [{:.6e}, {:.6e}]] (cin: {}, cout: {})",
            self.a(),
            self.b(),
            self.c(),
            self.d(),
            self.cin,
            self.cout
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    #[test]
    fn default() {
        let abcd = Abcd::default();
        assert_eq!(abcd.matrix(), &Matrix2::identity());
        assert_eq!(abcd.cin(), 1.0);
        assert_eq!(abcd.cout(), 1.0);
    }
    #[test]
    fn translation() {
        let t = Abcd::translation(2.0).unwrap();
        assert_eq!(t.b(), 2.0);
        assert_eq!(t.thickness().unwrap(), 2.0);
        assert_eq!(t.power().unwrap(), 0.0);
        assert!(t.focal_length().unwrap().is_infinite());
        assert!(Abcd::translation(f64::NAN).is_err());
    }
    #[test]
    fn thin_lens() {
        let l = Abcd::thin_lens(0.5).unwrap();
        assert_eq!(l.c(), -2.0);
        assert_relative_eq!(l.focal_length().unwrap(), 0.5);
        assert!(Abcd::thin_lens(0.0).is_err());
        assert!(Abcd::thin_lens(f64::INFINITY).is_err());
    }
    #[test]
    fn dioptre() {
        let d = Abcd::dioptre(0.1, 1.0, 1.5).unwrap();
        assert_relative_eq!(d.c(), -(1.0 - 1.0 / 1.5) * 0.1);
        assert_relative_eq!(d.d(), 1.0 / 1.5);
        assert_relative_eq!(d.determinant(), 1.0 / 1.5);
        let mirror = Abcd::dioptre(0.1, 1.0, -1.0).unwrap();
        assert_eq!(mirror.cin(), 1.0);
        assert_eq!(mirror.cout(), -1.0);
        assert_relative_eq!(mirror.c(), -0.2);
        assert_relative_eq!(mirror.d(), -1.0);
        assert_matches!(
            Abcd::dioptre(0.1, 0.0, 1.0),
            Err(PopError::Configuration(_))
        );
    }
    #[test]
    fn magnifier() {
        let m = Abcd::magnifier(2.0).unwrap();
        assert_eq!(m.a(), 2.0);
        assert_eq!(m.d(), 0.5);
        assert!(Abcd::magnifier(0.0).is_err());
    }
    #[test]
    fn decompose_composite() {
        let abcd = Abcd::new(0.3, 2.0, 1.0, 1.5, 3.0).unwrap();
        let p = abcd.decompose().unwrap();
        assert_relative_eq!(p.thickness, 0.3, max_relative = 1e-12);
        assert_relative_eq!(p.magnification, 3.0, max_relative = 1e-12);
        assert_relative_eq!(p.n1n2, 1.0 / 1.5, max_relative = 1e-12);
        assert_relative_eq!(p.power, (1.0 - 1.0 / 1.5) * 2.0, max_relative = 1e-12);
        assert_relative_eq!(
            abcd.focal_length().unwrap(),
            1.0 / (p.power * p.magnification),
            max_relative = 1e-12
        );
    }
    #[test]
    fn decompose_thin_lens_and_mirror() {
        let lens = Abcd::new(1.0, 0.5, 1.0, 1.0, 1.0).unwrap();
        let p = lens.decompose().unwrap();
        assert_relative_eq!(p.thickness, 1.0);
        assert_relative_eq!(p.power, 0.5);
        assert_relative_eq!(p.n1n2, 1.0);
        let mirror = Abcd::new(-2.0, 0.1, 1.0, -1.0, 1.0).unwrap();
        let p = mirror.decompose().unwrap();
        assert_relative_eq!(p.n1n2, -1.0);
        assert_relative_eq!(p.thickness, -2.0);
        assert_relative_eq!(p.power, 0.2);
    }
    #[test]
    fn degenerate() {
        let fourier = Abcd::from_elements(0.0, 1.0, -1.0, 0.0).unwrap();
        assert_matches!(fourier.decompose(), Err(PopError::Degenerate(_)));
        assert_matches!(fourier.thickness(), Err(PopError::Degenerate(_)));
        let singular = Abcd::from_elements(1.0, 1.0, 1.0, 1.0).unwrap();
        assert_matches!(singular.magnification(), Err(PopError::Degenerate(_)));
        assert_matches!(singular.inverse(), Err(PopError::Degenerate(_)));
        assert!(Abcd::from_elements(f64::NAN, 0.0, 0.0, 1.0).is_err());
    }
    #[test]
    fn multiplication() {
        let t = Abcd::translation(1.0).unwrap();
        let l = Abcd::thin_lens(1.0).unwrap();
        let system = t * l;
        assert_relative_eq!(system.a(), 0.0);
        assert_relative_eq!(system.b(), 1.0);
        assert_relative_eq!(system.c(), -1.0);
        assert_relative_eq!(system.d(), 1.0);
        // a parallel ray is focused on the axis
        let ray = system * RayVector::new(0.01, 0.0);
        assert_relative_eq!(ray[0], 0.0);
        assert_relative_eq!(ray[1], -0.01);
        let mirror = Abcd::dioptre(0.0, 1.0, -1.0).unwrap();
        let after = t.with_signs(-1.0, -1.0) * mirror;
        assert_eq!(after.cin(), 1.0);
        assert_eq!(after.cout(), -1.0);
    }
    #[test]
    fn translation_composability() {
        for t in [0.0, 1e-9, 0.3, -2.5, 1e3, 1e6] {
            let forward = Abcd::translation(t).unwrap();
            let back = Abcd::translation(-t).unwrap();
            let reflected = forward.with_signs(-1.0, -1.0);
            let reflected_back = back.with_signs(-1.0, -1.0);
            let flat_mirror = Abcd::dioptre(0.0, 1.0, -1.0).unwrap();
            for (product, d, cin, cout) in [
                (back * forward, 1.0, 1.0, 1.0),
                (reflected_back * reflected, 1.0, -1.0, -1.0),
                // a flat mirror keeps d = n1/n2 = -1
                (reflected_back * reflected * flat_mirror, -1.0, 1.0, -1.0),
            ] {
                assert_relative_eq!(product.a(), 1.0, epsilon = 1e-12);
                assert_relative_eq!(product.b(), 0.0, epsilon = 1e-12);
                assert_relative_eq!(product.c(), 0.0, epsilon = 1e-12);
                assert_relative_eq!(product.d(), d, epsilon = 1e-12);
                assert_eq!(product.cin(), cin);
                assert_eq!(product.cout(), cout);
            }
        }
    }
    #[test]
    fn inverse() {
        let abcd = Abcd::new(0.2, 1.0, 1.0, 1.0, 2.0).unwrap();
        let product = abcd * abcd.inverse().unwrap();
        assert_relative_eq!(product.a(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(product.b(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(product.c(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(product.d(), 1.0, epsilon = 1e-12);
    }
    #[test]
    fn display() {
        let s = format!("{}", Abcd::default());
        assert!(s.starts_with("[[1.000000e0, 0.000000e0]"));
    }
}
