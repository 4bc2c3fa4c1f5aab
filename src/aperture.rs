#![warn(missing_docs)]
//! Module for handling optical (2D) apertures
//!
//! An [`Aperture`] limits (or, as an obscuration, blocks) the wavefront at a surface. Two binary
//! shapes exist: ellipses and rectangles, both defined by their half-widths, an optional center
//! and an optional in-plane rotation. Each aperture can act as a "hole" or as an "obstruction".
//! By default, all configurations are created as "holes".
//! ```rust
//! use fresnel_pop::aperture::{Aperture, Apodize, ApertureType, EllipseConfig};
//! use fresnel_pop::millimeter;
//!
//! let mut c = EllipseConfig::new(millimeter!(1.0, 1.0)).unwrap();
//! assert_eq!(c.apodize(&millimeter!(0.5, 0.5)), 1.0);
//! c.set_aperture_type(ApertureType::Obstruction);
//! assert_eq!(c.apodize(&millimeter!(0.5, 0.5)), 0.0);
//! assert_eq!(Aperture::Elliptical(c).apodization_factor(&millimeter!(2.0, 0.0)), 1.0);
//! ```
//! On a sampling grid the apertures produce masks with values in `0.0..=1.0`. Edge pixels
//! are supersampled so that the mask follows the shape with sub-pixel accuracy.
use crate::{
    abcd::RayVector,
    error::{PopError, PopResult},
    utils::{griddata::SamplingGrid, usize_to_f64},
};
use nalgebra::{DMatrix, Point2};
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

/// number of sub-samples per axis used on pixels crossed by an aperture edge
const EDGE_SUPERSAMPLING: usize = 8;

/// The apodization type of an [`Aperture`].
///
/// Each aperture can act as a "hole" or "obstruction"
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApertureType {
    /// the [`Aperture`] shape acts as a hole. The inner part of the shape is transparent.
    #[default]
    Hole,
    /// the [`Aperture`] shape represents an obstruction. The inner part of the shape is opaque.
    Obstruction,
}

/// Different aperture types
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aperture {
    /// completely transparent aperture. This is the default.
    #[default]
    None,
    /// binary elliptical aperture defined by its semi axes
    Elliptical(EllipseConfig),
    /// binary rectangular aperture defined by its half widths
    Rectangular(RectangleConfig),
}

impl Aperture {
    /// Calculate the transmission factor of a given point on the [`Aperture`]. The value is in the range (0.0..=1.0)
    /// 0.0 is fully opaque, 1.0 fully transparent.
    #[must_use]
    pub fn apodization_factor(&self, point: &Point2<Length>) -> f64 {
        match self {
            Self::None => 1.0,
            Self::Elliptical(e) => e.apodize(point),
            Self::Rectangular(r) => r.apodize(point),
        }
    }
    fn shape(&self) -> Option<&ShapeParameters> {
        match self {
            Self::None => None,
            Self::Elliptical(e) => Some(&e.shape),
            Self::Rectangular(r) => Some(&r.shape),
        }
    }
    fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            Self::None => true,
            Self::Elliptical(e) => e.contains(x, y),
            Self::Rectangular(r) => r.contains(x, y),
        }
    }
    fn transmission(&self, inside_fraction: f64) -> f64 {
        match self.shape().map(|s| s.aperture_type) {
            Some(ApertureType::Obstruction) => 1.0 - inside_fraction,
            _ => inside_fraction,
        }
    }
    /// Returns the half-widths (semi axes) of the aperture shape, if any.
    #[must_use]
    pub fn half_widths(&self) -> Option<(Length, Length)> {
        self.shape().map(|s| s.half_widths)
    }
    /// Returns `true` if the aperture is an obscuration.
    #[must_use]
    pub fn is_obstruction(&self) -> bool {
        matches!(
            self.shape().map(|s| s.aperture_type),
            Some(ApertureType::Obstruction)
        )
    }
    /// Project this aperture onto the plane orthogonal to the local chief ray.
    ///
    /// The returned aperture is expressed relative to the chief ray position given by the
    /// tangential `(y, u_y)` and sagittal `(x, u_x)` ray vectors: an aperture without explicit
    /// center is centered on the chief ray, an explicit center is shifted by the chief ray
    /// position. The half-widths are scaled by `1/sqrt(1+u^2)` of the respective axis.
    #[must_use]
    pub fn projected(&self, tangential: &RayVector, sagittal: &RayVector) -> Self {
        let project = |shape: &ShapeParameters| {
            let mut shape = shape.clone();
            let chief = Point2::new(
                Length::new::<meter>(sagittal[0]),
                Length::new::<meter>(tangential[0]),
            );
            let center = shape.center.unwrap_or(chief);
            shape.center = Some(Point2::new(center.x - chief.x, center.y - chief.y));
            shape.half_widths = (
                shape.half_widths.0 * (1.0 / sagittal[1].mul_add(sagittal[1], 1.0)).sqrt(),
                shape.half_widths.1 * (1.0 / tangential[1].mul_add(tangential[1], 1.0)).sqrt(),
            );
            shape
        };
        match self {
            Self::None => Self::None,
            Self::Elliptical(e) => Self::Elliptical(EllipseConfig {
                shape: project(&e.shape),
            }),
            Self::Rectangular(r) => Self::Rectangular(RectangleConfig {
                shape: project(&r.shape),
            }),
        }
    }
    /// Sample the transmission of this aperture on the given grid.
    ///
    /// Pixels completely inside or outside the shape get a value of 1.0 or 0.0 (inverted for
    /// obstructions), pixels crossed by the edge get their covered area fraction.
    #[must_use]
    pub fn mask(&self, grid: &SamplingGrid) -> DMatrix<f64> {
        if matches!(self, Self::None) {
            return DMatrix::from_element(grid.ny(), grid.nx(), 1.0);
        }
        let x = grid.x_coordinates();
        let y = grid.y_coordinates();
        let (hx, hy) = (grid.dx() / 2.0, grid.dy() / 2.0);
        let sub = usize_to_f64(EDGE_SUPERSAMPLING);
        DMatrix::from_fn(grid.ny(), grid.nx(), |row, col| {
            let (xc, yc) = (x[col], y[row]);
            let center = self.contains(xc, yc);
            let corners = [(-hx, -hy), (hx, -hy), (-hx, hy), (hx, hy)];
            let fraction = if corners
                .iter()
                .all(|(ox, oy)| self.contains(xc + ox, yc + oy) == center)
            {
                if center {
                    1.0
                } else {
                    0.0
                }
            } else {
                let mut inside = 0_usize;
                for i in 0..EDGE_SUPERSAMPLING {
                    let sy = yc - hy + (usize_to_f64(i) + 0.5) * grid.dy() / sub;
                    for j in 0..EDGE_SUPERSAMPLING {
                        let sx = xc - hx + (usize_to_f64(j) + 0.5) * grid.dx() / sub;
                        if self.contains(sx, sy) {
                            inside += 1;
                        }
                    }
                }
                usize_to_f64(inside) / (sub * sub)
            };
            self.transmission(fraction)
        })
    }
    /// Binary support of this aperture on the given grid (pixel centers with non-zero transmission).
    #[must_use]
    pub fn support(&self, grid: &SamplingGrid) -> DMatrix<bool> {
        let x = grid.x_coordinates();
        let y = grid.y_coordinates();
        DMatrix::from_fn(grid.ny(), grid.nx(), |row, col| {
            let inside = if self.contains(x[col], y[row]) {
                1.0
            } else {
                0.0
            };
            self.transmission(inside) > 0.5
        })
    }
}

/// A trait for binary (2D-) apodizers.
pub trait Apodize {
    /// Set the apodizition type of the aperture.
    fn set_aperture_type(&mut self, aperture_type: ApertureType);

    /// Calculate the transmission coefficient for a point.
    ///
    /// The value is either 0.0 or 1.0 depending on whether the given point is inside or
    /// outside the aperture (or the opposite for an obstruction).
    fn apodize(&self, point: &Point2<Length>) -> f64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ShapeParameters {
    half_widths: (Length, Length),
    #[serde(default)]
    center: Option<Point2<Length>>,
    /// in-plane rotation (degrees, counter-clockwise)
    #[serde(default)]
    rotation: f64,
    #[serde(default, rename = "type")]
    aperture_type: ApertureType,
}

impl ShapeParameters {
    fn new(half_widths: Point2<Length>) -> PopResult<Self> {
        if half_widths.x.is_normal()
            && half_widths.x.is_sign_positive()
            && half_widths.y.is_normal()
            && half_widths.y.is_sign_positive()
        {
            Ok(Self {
                half_widths: (half_widths.x, half_widths.y),
                center: None,
                rotation: 0.0,
                aperture_type: ApertureType::default(),
            })
        } else {
            Err(PopError::Configuration(
                "half widths must be positive".into(),
            ))
        }
    }
    fn set_center(&mut self, center: Point2<Length>) -> PopResult<()> {
        if center.x.is_finite() && center.y.is_finite() {
            self.center = Some(center);
            Ok(())
        } else {
            Err(PopError::Configuration(
                "aperture center must be finite".into(),
            ))
        }
    }
    fn set_rotation(&mut self, rotation: f64) -> PopResult<()> {
        if rotation.is_finite() {
            self.rotation = rotation;
            Ok(())
        } else {
            Err(PopError::Configuration(
                "aperture rotation must be finite".into(),
            ))
        }
    }
    /// Normalized coordinates of a point in the frame of the (rotated) shape.
    fn local(&self, x: f64, y: f64) -> (f64, f64) {
        let (xc, yc) = self
            .center
            .map_or((0.0, 0.0), |c| (c.x.get::<meter>(), c.y.get::<meter>()));
        let (dx, dy) = (x - xc, y - yc);
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let u = dx.mul_add(cos, dy * sin);
        let v = (-dx).mul_add(sin, dy * cos);
        (
            u / self.half_widths.0.get::<meter>(),
            v / self.half_widths.1.get::<meter>(),
        )
    }
}

/// Configuration data for an elliptical aperture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipseConfig {
    #[serde(flatten)]
    shape: ShapeParameters,
}
impl EllipseConfig {
    /// Create a new [`EllipseConfig`] from its semi axes `(x, y)` centered on the chief ray.
    ///
    /// By default the aperture has the aperture type [`ApertureType::Hole`].
    ///
    /// # Errors
    ///
    /// This function will return an error if one of the semi axes is negative, NaN or Infinity.
    pub fn new(semi_axes: Point2<Length>) -> PopResult<Self> {
        Ok(Self {
            shape: ShapeParameters::new(semi_axes)?,
        })
    }
    /// Create a new circular aperture.
    ///
    /// # Errors
    ///
    /// This function will return an error if the radius is negative, NaN or Infinity.
    pub fn circle(radius: Length) -> PopResult<Self> {
        Self::new(Point2::new(radius, radius))
    }
    /// Set an explicit center point of the aperture.
    ///
    /// # Errors
    ///
    /// This function will return an error if the center is not finite.
    pub fn with_center(mut self, center: Point2<Length>) -> PopResult<Self> {
        self.shape.set_center(center)?;
        Ok(self)
    }
    /// Set an in-plane rotation (degrees).
    ///
    /// # Errors
    ///
    /// This function will return an error if the rotation is not finite.
    pub fn with_rotation(mut self, rotation: f64) -> PopResult<Self> {
        self.shape.set_rotation(rotation)?;
        Ok(self)
    }
    fn contains(&self, x: f64, y: f64) -> bool {
        let (u, v) = self.shape.local(x, y);
        u.mul_add(u, v * v) <= 1.0
    }
}
impl Apodize for EllipseConfig {
    fn set_aperture_type(&mut self, aperture_type: ApertureType) {
        self.shape.aperture_type = aperture_type;
    }
    fn apodize(&self, point: &Point2<Length>) -> f64 {
        let mut transmission = if self.contains(point.x.get::<meter>(), point.y.get::<meter>()) {
            1.0
        } else {
            0.0
        };
        if matches!(self.shape.aperture_type, ApertureType::Obstruction) {
            transmission = 1.0 - transmission;
        }
        transmission
    }
}

/// Configuration data for a rectangular aperture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleConfig {
    #[serde(flatten)]
    shape: ShapeParameters,
}
impl RectangleConfig {
    /// Create a new rectangular aperture configuration from its half-widths `(x, y)`, centered on the chief ray.
    ///
    /// By default the aperture has the aperture type [`ApertureType::Hole`].
    /// # Errors
    ///
    /// This function will return an error if width and/or height are negative, NaN or Infinity.
    pub fn new(half_widths: Point2<Length>) -> PopResult<Self> {
        Ok(Self {
            shape: ShapeParameters::new(half_widths)?,
        })
    }
    /// Set an explicit center point of the aperture.
    ///
    /// # Errors
    ///
    /// This function will return an error if the center is not finite.
    pub fn with_center(mut self, center: Point2<Length>) -> PopResult<Self> {
        self.shape.set_center(center)?;
        Ok(self)
    }
    /// Set an in-plane rotation (degrees).
    ///
    /// # Errors
    ///
    /// This function will return an error if the rotation is not finite.
    pub fn with_rotation(mut self, rotation: f64) -> PopResult<Self> {
        self.shape.set_rotation(rotation)?;
        Ok(self)
    }
    fn contains(&self, x: f64, y: f64) -> bool {
        let (u, v) = self.shape.local(x, y);
        u.abs() <= 1.0 && v.abs() <= 1.0
    }
}
impl Apodize for RectangleConfig {
    fn set_aperture_type(&mut self, aperture_type: ApertureType) {
        self.shape.aperture_type = aperture_type;
    }
    fn apodize(&self, point: &Point2<Length>) -> f64 {
        let mut transmission = if self.contains(point.x.get::<meter>(), point.y.get::<meter>()) {
            1.0
        } else {
            0.0
        };
        if matches!(self.shape.aperture_type, ApertureType::Obstruction) {
            transmission = 1.0 - transmission;
        }
        transmission
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{meter, millimeter, utils::math_utils::kahan_sum};
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    #[test]
    fn default() {
        let ap = Aperture::default();
        assert_eq!(ap.apodization_factor(&meter!(100.0, 100.0)), 1.0);
        assert!(ap.half_widths().is_none());
        assert!(!ap.is_obstruction());
    }
    #[test]
    fn ellipse_new() {
        assert!(EllipseConfig::new(meter!(1.0, 0.5)).is_ok());
        assert_matches!(
            EllipseConfig::new(meter!(0.0, 0.5)),
            Err(PopError::Configuration(_))
        );
        assert!(EllipseConfig::new(meter!(-1.0, 0.5)).is_err());
        assert!(EllipseConfig::new(meter!(f64::NAN, 0.5)).is_err());
        assert!(EllipseConfig::circle(meter!(f64::INFINITY)).is_err());
        let c = EllipseConfig::circle(meter!(1.0)).unwrap();
        assert!(c.with_center(meter!(f64::NAN, 0.0)).is_err());
    }
    #[test]
    fn ellipse_apodize() {
        let mut e = EllipseConfig::new(meter!(2.0, 1.0)).unwrap();
        assert_eq!(e.apodize(&meter!(1.9, 0.0)), 1.0);
        assert_eq!(e.apodize(&meter!(0.0, 1.1)), 0.0);
        e.set_aperture_type(ApertureType::Obstruction);
        assert_eq!(e.apodize(&meter!(1.9, 0.0)), 0.0);
        assert_eq!(e.apodize(&meter!(0.0, 1.1)), 1.0);
    }
    #[test]
    fn rotated_ellipse() {
        let e = EllipseConfig::new(meter!(2.0, 1.0))
            .unwrap()
            .with_rotation(90.0)
            .unwrap();
        assert_eq!(e.apodize(&meter!(0.0, 1.9)), 1.0);
        assert_eq!(e.apodize(&meter!(1.9, 0.0)), 0.0);
    }
    #[test]
    fn rectangle_apodize() {
        let r = RectangleConfig::new(meter!(1.0, 0.5))
            .unwrap()
            .with_center(meter!(1.0, 0.0))
            .unwrap();
        assert_eq!(r.apodize(&meter!(1.9, 0.4)), 1.0);
        assert_eq!(r.apodize(&meter!(0.1, 0.4)), 1.0);
        assert_eq!(r.apodize(&meter!(-0.1, 0.0)), 0.0);
        assert_eq!(r.apodize(&meter!(1.0, 0.6)), 0.0);
        assert!(RectangleConfig::new(meter!(1.0, 0.0)).is_err());
    }
    #[test]
    fn projection() {
        let ap = Aperture::Elliptical(EllipseConfig::circle(millimeter!(10.0)).unwrap());
        let vt = RayVector::new(0.002, 1.0);
        let vs = RayVector::new(-0.001, 0.0);
        let p = ap.projected(&vt, &vs);
        let (hx, hy) = p.half_widths().unwrap();
        assert_relative_eq!(hx.get::<meter>(), 0.01);
        assert_relative_eq!(hy.get::<meter>(), 0.01 / 2.0_f64.sqrt());
        // centered on the chief ray
        assert_eq!(p.apodization_factor(&millimeter!(0.0, 0.0)), 1.0);
        let ap = Aperture::Rectangular(
            RectangleConfig::new(millimeter!(1.0, 1.0))
                .unwrap()
                .with_center(millimeter!(0.0, 0.0))
                .unwrap(),
        );
        let p = ap.projected(&RayVector::new(0.0, 0.0), &RayVector::new(0.0015, 0.0));
        // explicit center is expressed relative to the chief ray
        assert_eq!(p.apodization_factor(&millimeter!(-1.0, 0.0)), 1.0);
        assert_eq!(p.apodization_factor(&millimeter!(0.0, 0.0)), 0.0);
        assert_eq!(Aperture::None.projected(&vt, &vs), Aperture::None);
    }
    #[test]
    fn mask_values_in_range_and_area() {
        let grid = SamplingGrid::new(128, 128, 0.01, 0.01).unwrap();
        let ap = Aperture::Elliptical(EllipseConfig::circle(meter!(0.3)).unwrap());
        let mask = ap.mask(&grid);
        assert!(mask.iter().all(|v| (0.0..=1.0).contains(v)));
        let area = kahan_sum(mask.iter().copied()) * 1e-4;
        assert_relative_eq!(area, std::f64::consts::PI * 0.09, max_relative = 1e-3);
        assert_eq!(mask[(64, 64)], 1.0);
        assert_eq!(mask[(0, 0)], 0.0);
    }
    #[test]
    fn obstruction_mask_is_complement() {
        let grid = SamplingGrid::new(64, 64, 0.01, 0.01).unwrap();
        let mut e = EllipseConfig::new(meter!(0.1, 0.05)).unwrap();
        let hole = Aperture::Elliptical(e.clone()).mask(&grid);
        e.set_aperture_type(ApertureType::Obstruction);
        let obstruction = Aperture::Elliptical(e);
        assert!(obstruction.is_obstruction());
        let obs = obstruction.mask(&grid);
        for (h, o) in hole.iter().zip(obs.iter()) {
            assert_relative_eq!(h + o, 1.0);
        }
        let support = obstruction.support(&grid);
        assert!(!support[(32, 32)]);
        assert!(support[(0, 0)]);
    }
    #[test]
    fn none_mask() {
        let grid = SamplingGrid::new(8, 8, 0.1, 0.1).unwrap();
        let mask = Aperture::None.mask(&grid);
        assert!(mask.iter().all(|v| *v == 1.0));
        assert!(Aperture::None.support(&grid).iter().all(|v| *v));
    }
    #[test]
    fn deserialize() {
        let ap: Aperture = serde_yaml::from_str(
            "elliptical:\n  half_widths: [0.5, 0.25]\n  type: obstruction\n  rotation: 10.0\n",
        )
        .unwrap();
        assert!(ap.is_obstruction());
        let (hx, hy) = ap.half_widths().unwrap();
        assert_eq!(hx, meter!(0.5));
        assert_eq!(hy, meter!(0.25));
        let ap: Aperture =
            serde_yaml::from_str("rectangular:\n  half_widths: [0.5, 0.25]\n  center: [0.1, 0.0]\n")
                .unwrap();
        assert!(!ap.is_obstruction());
        assert_eq!(ap.apodization_factor(&meter!(0.55, 0.0)), 1.0);
    }
}
