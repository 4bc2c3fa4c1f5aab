#![warn(missing_docs)]
//! Coordinate breaks: decenter and tilt of the local coordinate system.
//!
//! A coordinate break transforms the tangential `(y, u_y)` and sagittal `(x, u_x)` chief ray
//! vectors into the coordinate system of the next surface. The rotation is applied
//! intrinsically about X, then Y, then Z. The result is a pure function of its inputs.
use crate::abcd::RayVector;
use nalgebra::{Rotation3, Vector3};
use num::Zero;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uom::si::{f64::Length, length::meter};

/// Order in which decenter and rotation of a [`CoordinateBreak`] are applied.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BreakOrder {
    /// first decenter, then rotate (the "in" break of a pair)
    #[default]
    DecenterThenRotate,
    /// first rotate, then decenter (the "out" break of a pair, undoing an "in" break)
    RotateThenDecenter,
}

fn zero_length() -> Length {
    Length::zero()
}

/// Decenter and tilt parameters of a coordinate break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateBreak {
    #[serde(default = "zero_length")]
    x_decenter: Length,
    #[serde(default = "zero_length")]
    y_decenter: Length,
    /// tilt about the x axis (degrees)
    #[serde(default)]
    x_tilt: f64,
    /// tilt about the y axis (degrees)
    #[serde(default)]
    y_tilt: f64,
    /// tilt about the z axis (degrees)
    #[serde(default)]
    z_tilt: f64,
    #[serde(default)]
    order: BreakOrder,
}

impl Default for CoordinateBreak {
    fn default() -> Self {
        Self {
            x_decenter: Length::zero(),
            y_decenter: Length::zero(),
            x_tilt: 0.0,
            y_tilt: 0.0,
            z_tilt: 0.0,
            order: BreakOrder::default(),
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl CoordinateBreak {
    /// Create a new coordinate break from a decenter and tilt angles in degrees.
    ///
    /// Non-finite values are treated as zero when the break is applied.
    #[must_use]
    pub const fn new(
        x_decenter: Length,
        y_decenter: Length,
        x_tilt: f64,
        y_tilt: f64,
        z_tilt: f64,
        order: BreakOrder,
    ) -> Self {
        Self {
            x_decenter,
            y_decenter,
            x_tilt,
            y_tilt,
            z_tilt,
            order,
        }
    }
    /// Returns the decenter `(x, y)`.
    #[must_use]
    pub const fn decenter(&self) -> (Length, Length) {
        (self.x_decenter, self.y_decenter)
    }
    /// Returns the tilt angles `(x, y, z)` in degrees.
    #[must_use]
    pub const fn tilts(&self) -> (f64, f64, f64) {
        (self.x_tilt, self.y_tilt, self.z_tilt)
    }
    /// Returns the [`BreakOrder`].
    #[must_use]
    pub const fn order(&self) -> BreakOrder {
        self.order
    }
    /// Returns `true` if this break neither decenters nor tilts.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        [
            self.x_decenter.get::<meter>(),
            self.y_decenter.get::<meter>(),
            self.x_tilt,
            self.y_tilt,
            self.z_tilt,
        ]
        .iter()
        .all(|v| finite_or_zero(*v) == 0.0)
    }
    fn rotation(&self) -> Rotation3<f64> {
        let angle = |deg: f64| finite_or_zero(deg).to_radians();
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), angle(self.x_tilt));
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), angle(self.y_tilt));
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), angle(self.z_tilt));
        rx * ry * rz
    }
    /// Transform the tangential `(y, u_y)` and sagittal `(x, u_x)` ray vectors into the broken
    /// coordinate system.
    ///
    /// The ray is intersected with the new `z = 0` plane. Returns the new `(tangential, sagittal)`
    /// vectors.
    #[must_use]
    pub fn apply(&self, tangential: &RayVector, sagittal: &RayVector) -> (RayVector, RayVector) {
        let xdec = finite_or_zero(self.x_decenter.get::<meter>());
        let ydec = finite_or_zero(self.y_decenter.get::<meter>());
        let inverse = self.rotation().inverse();
        let (r0, post_offset) = match self.order {
            BreakOrder::DecenterThenRotate => (
                Vector3::new(sagittal[0] - xdec, tangential[0] - ydec, 0.0),
                (0.0, 0.0),
            ),
            BreakOrder::RotateThenDecenter => (
                Vector3::new(sagittal[0], tangential[0], 0.0),
                (xdec, ydec),
            ),
        };
        let n0 = Vector3::new(sagittal[1], tangential[1], 1.0);
        let mut n1 = inverse * n0;
        n1 /= n1.z;
        let r1_plane = inverse * r0;
        let r1 = r1_plane - n1 * (r1_plane.z / n1.z);
        (
            RayVector::new(r1.y - post_offset.1, n1.y),
            RayVector::new(r1.x - post_offset.0, n1.x),
        )
    }
}
