//! The pilot gaussian beam.
//!
//! The pilot beam is an analytically tracked gaussian beam that accompanies the sampled field.
//! It does not take part in the diffraction calculation but decides which propagation primitive
//! is used and how the sampling grid scales.
use std::fmt::Display;

use crate::error::{PopError, PopResult};

/// Position relative to the Rayleigh range of the pilot beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// within the (scaled) Rayleigh distance from the waist
    Inside,
    /// farther away from the waist
    Outside,
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inside => write!(f, "I"),
            Self::Outside => write!(f, "O"),
        }
    }
}

/// State of the pilot beam along one transverse axis.
///
/// All lengths are in meter and refer to the medium the beam currently travels in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PilotBeam {
    /// current position along the optical axis
    z: f64,
    /// waist radius
    w0: f64,
    /// position of the waist
    zw0: f64,
    /// Rayleigh distance
    zr: f64,
}

impl PilotBeam {
    /// Create a pilot beam with its waist at `z = 0`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the waist or the wavelength is not a positive finite
    /// number.
    pub fn new(w0: f64, wavelength: f64) -> PopResult<Self> {
        if !w0.is_normal() || w0 < 0.0 {
            return Err(PopError::Degenerate(
                "pilot beam waist must be > 0".into(),
            ));
        }
        if !wavelength.is_normal() || wavelength < 0.0 {
            return Err(PopError::Configuration(
                "wavelength must be > 0".into(),
            ));
        }
        Ok(Self {
            z: 0.0,
            w0,
            zw0: 0.0,
            zr: std::f64::consts::PI * w0 * w0 / wavelength,
        })
    }
    /// Current position along the optical axis.
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.z
    }
    /// Waist radius.
    #[must_use]
    pub const fn w0(&self) -> f64 {
        self.w0
    }
    /// Position of the waist.
    #[must_use]
    pub const fn zw0(&self) -> f64 {
        self.zw0
    }
    /// Rayleigh distance.
    #[must_use]
    pub const fn zr(&self) -> f64 {
        self.zr
    }
    /// Beam radius `w(z)` at the current position.
    #[must_use]
    pub fn wz(&self) -> f64 {
        let dz = (self.z - self.zw0) / self.zr;
        self.w0 * dz.mul_add(dz, 1.0).sqrt()
    }
    /// Phase radius of curvature `R(z) = dz + zr^2/dz` (infinite on the waist).
    #[must_use]
    pub fn radius_of_curvature(&self) -> f64 {
        let dz = self.z - self.zw0;
        if dz == 0.0 {
            f64::INFINITY
        } else {
            dz + self.zr * self.zr / dz
        }
    }
    /// Signed distance from the current position to the waist.
    #[must_use]
    pub fn distance_to_focus(&self) -> f64 {
        self.zw0 - self.z
    }
    /// Classify the position `z` with respect to `rayleigh_factor` times the Rayleigh distance.
    ///
    /// A position exactly on the waist is always inside.
    #[must_use]
    pub fn region_at(&self, z: f64, rayleigh_factor: f64) -> Region {
        if (z - self.zw0).abs() <= rayleigh_factor * self.zr {
            Region::Inside
        } else {
            Region::Outside
        }
    }
    /// Classify the current position.
    #[must_use]
    pub fn region(&self, rayleigh_factor: f64) -> Region {
        self.region_at(self.z, rayleigh_factor)
    }
    pub(super) fn set_z(&mut self, z: f64) {
        self.z = z;
    }
    pub(super) fn set_waist(&mut self, w0: f64, zw0: f64, zr: f64) {
        self.w0 = w0;
        self.zw0 = zw0;
        self.zr = zr;
    }
}
