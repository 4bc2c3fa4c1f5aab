#![warn(missing_docs)]
//! The sampled complex wavefront and its pilot beam.
//!
//! A [`Wavefront`] owns a square complex field together with the state of the pilot gaussian
//! beam (see [`PilotBeam`]). All operations of a surface (aperture, stop, aberrations,
//! magnification, change of medium, lens and propagation) mutate the wavefront in place and keep
//! the pilot beam, the reference curvature and the sampling pitch consistent with each other.
//!
//! The reference curvature `C` is zero while the field is sampled on a plane reference
//! (near the waist) and `1/(z - z_w)` while it is sampled relative to a spherical reference
//! (far from the waist).
use log::{debug, trace, warn};
use nalgebra::DMatrix;
use num::complex::Complex64;
use std::f64::consts::PI;
use uom::si::{f64::Length, length::meter};

use crate::{
    abcd::Abcd,
    aberration::AberrationMap,
    aperture::Aperture,
    error::{PopError, PopResult},
    run_parameters::RunParameters,
    utils::{griddata::SamplingGrid, math_utils::kahan_sum, usize_to_f64},
};

pub mod pilot_beam;
pub mod propagation;

pub use pilot_beam::{PilotBeam, Region};
pub use propagation::PropagatorKind;

/// Tolerance below which a magnification is treated as unity.
const UNIT_MAGNIFICATION_TOLERANCE: f64 = 1.0e-8;
/// Thickness below which no propagation step is performed.
const MIN_THICKNESS: f64 = 1.0e-10;

/// A sampled complex wavefront.
#[derive(Debug, Clone)]
pub struct Wavefront {
    field: DMatrix<Complex64>,
    /// wavelength in the current medium
    wavelength: f64,
    dx: f64,
    dy: f64,
    pilot: PilotBeam,
    /// curvature of the reference surface
    curvature: f64,
    fratio: f64,
    rayleigh_factor: f64,
    last_propagator: Option<PropagatorKind>,
}

impl Wavefront {
    /// Create a new uniform plane wavefront.
    ///
    /// The beam of the given diameter covers `grid_size / zoom` pixels, i.e. the sampling pitch
    /// is `beam_diameter * zoom / grid_size`. The pilot beam starts with its waist (radius
    /// `beam_diameter / 2`) at `z = 0`.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///  - the beam diameter or the wavelength is not positive
    ///  - the grid size is not a power of two or the zoom is zero
    ///  - the field cannot be allocated
    pub fn new(
        beam_diameter: Length,
        wavelength: Length,
        grid_size: usize,
        zoom: usize,
    ) -> PopResult<Self> {
        let diameter = beam_diameter.get::<meter>();
        let wavelength = wavelength.get::<meter>();
        if !diameter.is_normal() || diameter < 0.0 {
            return Err(PopError::Configuration(
                "beam diameter must be > 0".into(),
            ));
        }
        if !grid_size.is_power_of_two() || grid_size < 2 {
            return Err(PopError::Configuration(format!(
                "grid size {grid_size} is not a power of two"
            )));
        }
        if zoom == 0 {
            return Err(PopError::Configuration("zoom must be > 0".into()));
        }
        let pilot = PilotBeam::new(diameter / 2.0, wavelength)?;
        let field = allocate_field(grid_size)?;
        let pitch = diameter * usize_to_f64(zoom) / usize_to_f64(grid_size);
        Ok(Self {
            field,
            wavelength,
            dx: pitch,
            dy: pitch,
            pilot,
            curvature: 0.0,
            fratio: f64::INFINITY,
            rayleigh_factor: 1.0,
            last_propagator: None,
        })
    }
    /// Create a new wavefront from the given run parameters, including their Rayleigh factor.
    ///
    /// # Errors
    ///
    /// see [`Wavefront::new`] and [`Wavefront::set_rayleigh_factor`]
    pub fn from_parameters(params: &RunParameters) -> PopResult<Self> {
        let mut wavefront = Self::new(
            params.pupil_diameter(),
            params.wavelength(),
            params.grid_size(),
            params.zoom(),
        )?;
        wavefront.set_rayleigh_factor(params.rayleigh_factor())?;
        Ok(wavefront)
    }
    /// Returns the complex field (rows along y, columns along x).
    #[must_use]
    pub const fn field(&self) -> &DMatrix<Complex64> {
        &self.field
    }
    /// Replace the complex field.
    ///
    /// # Errors
    ///
    /// This function will return an error if the shape of the new field differs.
    pub fn set_field(&mut self, field: DMatrix<Complex64>) -> PopResult<()> {
        if field.shape() != self.field.shape() {
            return Err(PopError::Other(format!(
                "field shape {:?} does not match the grid {:?}",
                field.shape(),
                self.field.shape()
            )));
        }
        self.field = field;
        Ok(())
    }
    /// Amplitude of the field.
    #[must_use]
    pub fn amplitude(&self) -> DMatrix<f64> {
        self.field.map(|c| c.norm())
    }
    /// Phase of the field (radian).
    #[must_use]
    pub fn phase(&self) -> DMatrix<f64> {
        self.field.map(|c| c.arg())
    }
    /// Intensity (squared amplitude) of the field.
    #[must_use]
    pub fn intensity(&self) -> DMatrix<f64> {
        self.field.map(|c| c.norm_sqr())
    }
    /// Total power (sum of the squared amplitude).
    #[must_use]
    pub fn total_power(&self) -> f64 {
        kahan_sum(self.field.iter().map(Complex64::norm_sqr))
    }
    /// Number of samples along one axis.
    #[must_use]
    pub fn grid_size(&self) -> usize {
        self.field.ncols()
    }
    /// Sampling pitch along x (meter).
    #[must_use]
    pub const fn dx(&self) -> f64 {
        self.dx
    }
    /// Sampling pitch along y (meter).
    #[must_use]
    pub const fn dy(&self) -> f64 {
        self.dy
    }
    /// The sampling grid of the field.
    ///
    /// # Errors
    ///
    /// This function will return an error if the sampling pitch has degenerated.
    pub fn grid(&self) -> PopResult<SamplingGrid> {
        SamplingGrid::new(self.field.ncols(), self.field.nrows(), self.dx, self.dy)
            .map_err(|_| PopError::Degenerate("sampling pitch degenerated".into()))
    }
    /// Physical extent `(xmin, xmax, ymin, ymax)` of the pixel centers.
    #[must_use]
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let half_x = usize_to_f64(self.field.ncols() / 2);
        let half_y = usize_to_f64(self.field.nrows() / 2);
        (
            -half_x * self.dx,
            (half_x - 1.0) * self.dx,
            -half_y * self.dy,
            (half_y - 1.0) * self.dy,
        )
    }
    /// Wavelength in the current medium (meter).
    #[must_use]
    pub const fn wavelength(&self) -> f64 {
        self.wavelength
    }
    /// The pilot beam.
    #[must_use]
    pub const fn pilot_beam(&self) -> &PilotBeam {
        &self.pilot
    }
    /// Current position along the optical axis.
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.pilot.z()
    }
    /// Waist radius of the pilot beam.
    #[must_use]
    pub const fn w0(&self) -> f64 {
        self.pilot.w0()
    }
    /// Beam radius of the pilot beam at the current position.
    #[must_use]
    pub fn wz(&self) -> f64 {
        self.pilot.wz()
    }
    /// Waist position of the pilot beam.
    #[must_use]
    pub const fn zw0(&self) -> f64 {
        self.pilot.zw0()
    }
    /// Rayleigh distance of the pilot beam.
    #[must_use]
    pub const fn zr(&self) -> f64 {
        self.pilot.zr()
    }
    /// Signed distance to the waist of the pilot beam.
    #[must_use]
    pub fn distance_to_focus(&self) -> f64 {
        self.pilot.distance_to_focus()
    }
    /// Curvature of the reference surface (zero for a plane reference).
    #[must_use]
    pub const fn curvature(&self) -> f64 {
        self.curvature
    }
    /// Focal ratio of the pilot beam (infinite before the first lens).
    #[must_use]
    pub const fn fratio(&self) -> f64 {
        self.fratio
    }
    /// Multiple of the Rayleigh distance separating the inside from the outside region.
    #[must_use]
    pub const fn rayleigh_factor(&self) -> f64 {
        self.rayleigh_factor
    }
    /// Set the multiple of the Rayleigh distance separating the inside from the outside region.
    ///
    /// # Errors
    ///
    /// This function will return an error if the factor is not positive and finite.
    pub fn set_rayleigh_factor(&mut self, rayleigh_factor: f64) -> PopResult<()> {
        if !rayleigh_factor.is_normal() || rayleigh_factor < 0.0 {
            return Err(PopError::Configuration(
                "Rayleigh factor must be > 0".into(),
            ));
        }
        self.rayleigh_factor = rayleigh_factor;
        Ok(())
    }
    /// Propagator used by the last propagation step.
    #[must_use]
    pub const fn last_propagator(&self) -> Option<PropagatorKind> {
        self.last_propagator
    }
    /// Region of the current position with respect to the pilot beam.
    #[must_use]
    pub fn region(&self) -> Region {
        self.pilot.region(self.rayleigh_factor)
    }
    /// Multiply the field with the transmission of an aperture or obscuration.
    ///
    /// The aperture coordinates are relative to the grid center.
    ///
    /// # Errors
    ///
    /// This function will return an error if the sampling grid is degenerate.
    pub fn aperture(&mut self, aperture: &Aperture) -> PopResult<()> {
        if matches!(aperture, Aperture::None) {
            return Ok(());
        }
        let mask = aperture.mask(&self.grid()?);
        self.field.zip_apply(&mask, |f, m| *f *= m);
        Ok(())
    }
    /// Normalize the field to unit total power.
    ///
    /// # Errors
    ///
    /// This function will return an error if the field carries no power.
    pub fn make_stop(&mut self) -> PopResult<()> {
        let power = self.total_power();
        if !power.is_normal() {
            return Err(PopError::Degenerate(
                "cannot normalize a field without power at the stop".into(),
            ));
        }
        let norm = 1.0 / power.sqrt();
        self.field.apply(|f| *f *= norm);
        Ok(())
    }
    /// Apply a wavefront error map: `field *= exp(i 2 pi W / lambda)`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the map does not match the grid.
    pub fn apply_aberration(&mut self, map: &AberrationMap) -> PopResult<()> {
        if map.wfe().shape() != self.field.shape() {
            return Err(PopError::Other(
                "aberration map does not match the grid".into(),
            ));
        }
        let k = 2.0 * PI / self.wavelength;
        self.field
            .zip_apply(map.wfe(), |f, w| *f *= Complex64::from_polar(1.0, k * w));
        Ok(())
    }
    fn apply_quadratic_phase(&mut self, phase_x: f64, phase_y: f64) -> PopResult<()> {
        let grid = self.grid()?;
        let x = grid.x_coordinates();
        let y = grid.y_coordinates();
        let scale = -2.0 * PI * 0.5 / self.wavelength;
        let (nrows, ncols) = self.field.shape();
        for col in 0..ncols {
            for row in 0..nrows {
                let q = (x[col] * x[col]).mul_add(phase_x, y[row] * y[row] * phase_y);
                self.field[(row, col)] *= Complex64::from_polar(1.0, scale * q);
            }
        }
        Ok(())
    }
    /// Apply a rotationally symmetric thin lens of the given focal length (meter, positive for
    /// converging lenses).
    ///
    /// The pilot beam is refocused. The applied quadratic phase accounts for the change of the
    /// reference surface depending on the regions before and after the lens. Returns the
    /// corresponding [`PropagatorKind`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the focal length is zero or not a number.
    pub fn lens(&mut self, focal_length: f64) -> PopResult<PropagatorKind> {
        if focal_length == 0.0 || focal_length.is_nan() {
            return Err(PopError::Degenerate(
                "lens focal length must not be zero".into(),
            ));
        }
        let power = 1.0 / focal_length;
        self.anamorphic_lens(power, power)
    }
    /// Apply a thin lens with separate powers (1/m) along x (sagittal) and y (tangential).
    ///
    /// The pilot beam is refocused with the sagittal power, or with the tangential one if the
    /// sagittal power is zero. Each axis receives the quadratic phase of its own power, corrected
    /// by the change of the (common) reference surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if both powers are zero, a power is not finite or the
    /// pilot beam degenerates.
    pub fn anamorphic_lens(&mut self, power_x: f64, power_y: f64) -> PopResult<PropagatorKind> {
        if !(power_x.is_finite() && power_y.is_finite()) {
            return Err(PopError::Degenerate("lens power must be finite".into()));
        }
        let pilot_power = if power_x == 0.0 { power_y } else { power_x };
        if pilot_power == 0.0 {
            return Err(PopError::Degenerate(
                "lens without optical power".into(),
            ));
        }
        let focal_length = 1.0 / pilot_power;
        let z = self.pilot.z();
        let wz = self.pilot.wz();
        let zr = self.pilot.zr();
        let dz_obj = z - self.pilot.zw0();
        let before = self.region();
        let gc_obj = dz_obj / dz_obj.mul_add(dz_obj, zr * zr);
        let gc_ima = gc_obj - 1.0 / focal_length;
        let a = PI * wz * wz / self.wavelength;
        let w0 = wz / (a * gc_ima).mul_add(a * gc_ima, 1.0).sqrt();
        let zw0 = -gc_ima / gc_ima.mul_add(gc_ima, 1.0 / (a * a)) + z;
        let zr = PI * w0 * w0 / self.wavelength;
        if !(w0.is_normal() && zw0.is_finite() && zr.is_normal()) {
            return Err(PopError::Degenerate(
                "pilot beam degenerated at lens".into(),
            ));
        }
        self.pilot.set_waist(w0, zw0, zr);
        let after = self.region();
        let kind = PropagatorKind::from_regions(before, after);
        let c_obj = if before == Region::Inside || self.curvature == 0.0 {
            0.0
        } else {
            1.0 / dz_obj
        };
        let dz_ima = z - zw0;
        let c_ima = if after == Region::Inside {
            0.0
        } else {
            1.0 / dz_ima
        };
        self.curvature = c_ima;
        let bias = match kind {
            PropagatorKind::InsideToInside => 0.0,
            PropagatorKind::InsideToOutside => c_ima,
            PropagatorKind::OutsideToInside => -c_obj,
            PropagatorKind::OutsideToOutside => c_ima - c_obj,
        };
        let (phase_x, phase_y) = (power_x + bias, power_y + bias);
        trace!(
            "lens f={focal_length:.6e} m ({kind}), applied power x: {phase_x:.6e} 1/m, y: {phase_y:.6e} 1/m"
        );
        self.fratio = dz_ima.abs() / (2.0 * wz);
        self.apply_quadratic_phase(phase_x, phase_y)?;
        Ok(kind)
    }
    /// Scale the beam by the sagittal (`ms`) and tangential (`mt`) magnification.
    ///
    /// The sampling pitch is scaled per axis. The pilot beam follows the sagittal magnification
    /// unless it is unity, in which case the tangential one is used.
    ///
    /// # Errors
    ///
    /// This function will return an error if a magnification is not positive.
    pub fn magnification(&mut self, ms: f64, mt: f64) -> PopResult<()> {
        if !(ms.is_finite() && ms > 0.0 && mt.is_finite() && mt > 0.0) {
            return Err(PopError::Degenerate(format!(
                "magnification must be > 0 (sagittal: {ms}, tangential: {mt})"
            )));
        }
        self.dx *= ms;
        self.dy *= mt;
        let m = if (ms - 1.0).abs() < UNIT_MAGNIFICATION_TOLERANCE {
            mt
        } else {
            ms
        };
        if (m - 1.0).abs() < UNIT_MAGNIFICATION_TOLERANCE {
            return Ok(());
        }
        if (ms - mt).abs() > UNIT_MAGNIFICATION_TOLERANCE
            && (ms - 1.0).abs() > UNIT_MAGNIFICATION_TOLERANCE
            && (mt - 1.0).abs() > UNIT_MAGNIFICATION_TOLERANCE
        {
            warn!("anamorphic magnification: pilot beam follows the sagittal axis only");
        }
        let z = self.pilot.z();
        let dz = (z - self.pilot.zw0()) * m * m;
        let wz = self.pilot.wz() * m;
        self.pilot
            .set_waist(self.pilot.w0() * m, z - dz, self.pilot.zr() * m * m);
        if self.curvature != 0.0 {
            self.curvature = 1.0 / dz;
        }
        self.fratio = dz.abs() / (2.0 * wz);
        Ok(())
    }
    /// Change into a medium with the index ratio `n1/n2`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the index ratio is zero or not finite.
    pub fn change_medium(&mut self, n1n2: f64) -> PopResult<()> {
        if !n1n2.is_normal() {
            return Err(PopError::Degenerate(format!(
                "invalid refractive index ratio {n1n2}"
            )));
        }
        let n = n1n2.abs();
        let z = self.pilot.z();
        let dz = (z - self.pilot.zw0()) / n;
        self.pilot
            .set_waist(self.pilot.w0(), z - dz, self.pilot.zr() / n);
        self.wavelength *= n;
        self.fratio /= n;
        if self.curvature != 0.0 {
            self.curvature = 1.0 / dz;
        }
        Ok(())
    }
    /// Apply the optical effect of a surface described by its sagittal and tangential ABCD
    /// matrices: magnification, change of medium, lens power and propagation over the
    /// thickness.
    ///
    /// Thickness and index ratio are taken from the sagittal matrix. Each axis receives the lens
    /// power of its own matrix, the pilot beam follows the sagittal power unless it is zero.
    /// Returns the propagator of the propagation step (if any).
    ///
    /// # Errors
    ///
    /// This function will return an error if a matrix cannot be decomposed or one of the
    /// operations fails.
    pub fn apply_abcd(
        &mut self,
        sagittal: &Abcd,
        tangential: &Abcd,
    ) -> PopResult<Option<PropagatorKind>> {
        let s = sagittal.decompose()?;
        let t = tangential.decompose()?;
        if s.magnification != 1.0 || t.magnification != 1.0 {
            trace!(
                "apply magnification (sagittal: {}, tangential: {})",
                s.magnification,
                t.magnification
            );
            self.magnification(s.magnification, t.magnification)?;
        }
        if s.n1n2.abs() != 1.0 {
            trace!("apply medium change n1/n2 = {:.4}", s.n1n2);
            self.change_medium(s.n1n2)?;
        }
        let power_x = s.power * sagittal.cout();
        let power_y = t.power * tangential.cout();
        if power_x != 0.0 || power_y != 0.0 {
            self.anamorphic_lens(power_x, power_y)?;
        }
        let thickness = sagittal.cout() * s.thickness;
        if thickness.is_finite() && thickness.abs() > MIN_THICKNESS {
            debug!("apply propagation thickness: {thickness:.6e} m");
            return self.propagate(thickness).map(Some);
        }
        Ok(None)
    }
}

fn allocate_field(grid_size: usize) -> PopResult<DMatrix<Complex64>> {
    let len = grid_size
        .checked_mul(grid_size)
        .ok_or_else(|| PopError::Resource(format!("grid size {grid_size} too large")))?;
    let mut data: Vec<Complex64> = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        PopError::Resource(format!(
            "cannot allocate a {grid_size}x{grid_size} field: {e}"
        ))
    })?;
    data.resize(len, Complex64::new(1.0, 0.0));
    Ok(DMatrix::from_vec(grid_size, grid_size, data))
}
