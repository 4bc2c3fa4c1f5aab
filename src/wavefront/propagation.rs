//! Fresnel propagation primitives and their selection.
//!
//! Three primitives are combined depending on where start and end position lie with respect to
//! the Rayleigh range of the pilot beam:
//!  - plane to plane (PTP): angular spectrum propagation of a flat wavefront, constant sampling
//!  - waist to spherical (WTS): single FFT Fresnel transform from the waist to a curved reference
//!    sphere, the sampling pitch becomes `lambda |dz| / (N dx)`
//!  - spherical to waist (STW): the inverse of WTS
use std::fmt::Display;

use log::{debug, trace};
use num::complex::Complex64;
use std::f64::consts::PI;

use super::{pilot_beam::Region, Wavefront};
use crate::{
    error::{PopError, PopResult},
    utils::{
        fft::{fft2_forward, fft2_inverse, fftfreq, fftshift, ifftshift},
        usize_to_f64,
    },
};

/// Combination of primitives used for a propagation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagatorKind {
    /// inside to inside: PTP
    InsideToInside,
    /// inside to outside: PTP to the waist, then WTS
    InsideToOutside,
    /// outside to inside: STW to the waist, then PTP
    OutsideToInside,
    /// outside to outside: STW to the waist, then WTS
    OutsideToOutside,
}

impl PropagatorKind {
    /// Select the propagator from the regions of start and end position.
    #[must_use]
    pub const fn from_regions(start: Region, end: Region) -> Self {
        match (start, end) {
            (Region::Inside, Region::Inside) => Self::InsideToInside,
            (Region::Inside, Region::Outside) => Self::InsideToOutside,
            (Region::Outside, Region::Inside) => Self::OutsideToInside,
            (Region::Outside, Region::Outside) => Self::OutsideToOutside,
        }
    }
    /// Region of the start position.
    #[must_use]
    pub const fn start(self) -> Region {
        match self {
            Self::InsideToInside | Self::InsideToOutside => Region::Inside,
            Self::OutsideToInside | Self::OutsideToOutside => Region::Outside,
        }
    }
    /// Region of the end position.
    #[must_use]
    pub const fn end(self) -> Region {
        match self {
            Self::InsideToInside | Self::OutsideToInside => Region::Inside,
            Self::InsideToOutside | Self::OutsideToOutside => Region::Outside,
        }
    }
}

impl Display for PropagatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.start(), self.end())
    }
}

impl Wavefront {
    /// Skip steps shorter than a thousandth of a wavelength (the position is still updated).
    fn negligible(&mut self, dz: f64) -> bool {
        if dz.abs() < 0.001 * self.wavelength {
            trace!("step of {dz:.3e} m smaller than 1/1000 wavelength, skipped");
            self.pilot.set_z(self.pilot.z() + dz);
            true
        } else {
            false
        }
    }
    /// Quadratic phase `exp(i sign pi lambda dz (fx^2 + fy^2))` on an unshifted spectrum.
    fn apply_transfer_function(&mut self, dz: f64, sign: f64) {
        let (nrows, ncols) = self.field.shape();
        let fx = fftfreq(ncols, self.dx);
        let fy = fftfreq(nrows, self.dy);
        let factor = sign * PI * self.wavelength * dz;
        for col in 0..ncols {
            for row in 0..nrows {
                let f2 = fx[col].mul_add(fx[col], fy[row] * fy[row]);
                self.field[(row, col)] *= Complex64::from_polar(1.0, factor * f2);
            }
        }
    }
    /// Plane to plane propagation over `dz`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the wavefront is not planar (non-zero reference
    /// curvature).
    pub(super) fn ptp(&mut self, dz: f64) -> PopResult<()> {
        if self.negligible(dz) {
            return Ok(());
        }
        if self.curvature != 0.0 {
            return Err(PopError::Degenerate(
                "plane to plane propagation requires a planar wavefront".into(),
            ));
        }
        ifftshift(&mut self.field);
        fft2_forward(&mut self.field);
        self.apply_transfer_function(dz, -1.0);
        fft2_inverse(&mut self.field);
        fftshift(&mut self.field);
        self.pilot.set_z(self.pilot.z() + dz);
        Ok(())
    }
    /// Spherical to waist propagation over `dz`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the wavefront is planar.
    pub(super) fn stw(&mut self, dz: f64) -> PopResult<()> {
        if self.negligible(dz) {
            return Ok(());
        }
        if self.curvature == 0.0 {
            return Err(PopError::Degenerate(
                "spherical to waist propagation requires a curved wavefront".into(),
            ));
        }
        let (nrows, ncols) = self.field.shape();
        ifftshift(&mut self.field);
        if dz >= 0.0 {
            fft2_forward(&mut self.field);
        } else {
            fft2_inverse(&mut self.field);
        }
        self.apply_transfer_function(dz, 1.0);
        fftshift(&mut self.field);
        self.pilot.set_z(self.pilot.z() + dz);
        self.curvature = 0.0;
        self.dx = self.wavelength * dz.abs() / (usize_to_f64(ncols) * self.dx);
        self.dy = self.wavelength * dz.abs() / (usize_to_f64(nrows) * self.dy);
        Ok(())
    }
    /// Waist to spherical propagation over `dz`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the wavefront is not planar.
    pub(super) fn wts(&mut self, dz: f64) -> PopResult<()> {
        if self.negligible(dz) {
            return Ok(());
        }
        if self.curvature != 0.0 {
            return Err(PopError::Degenerate(
                "waist to spherical propagation requires a planar wavefront".into(),
            ));
        }
        let (nrows, ncols) = self.field.shape();
        let grid = self.grid()?;
        let x = grid.x_coordinates();
        let y = grid.y_coordinates();
        let factor = PI / (self.wavelength * dz);
        for col in 0..ncols {
            for row in 0..nrows {
                let r2 = x[col].mul_add(x[col], y[row] * y[row]);
                self.field[(row, col)] *= Complex64::from_polar(1.0, factor * r2);
            }
        }
        ifftshift(&mut self.field);
        if dz >= 0.0 {
            fft2_forward(&mut self.field);
        } else {
            fft2_inverse(&mut self.field);
        }
        fftshift(&mut self.field);
        self.pilot.set_z(self.pilot.z() + dz);
        self.curvature = 1.0 / (self.pilot.z() - self.pilot.zw0());
        self.dx = self.wavelength * dz.abs() / (usize_to_f64(ncols) * self.dx);
        self.dy = self.wavelength * dz.abs() / (usize_to_f64(nrows) * self.dy);
        Ok(())
    }
    /// Propagate the field over the (signed) distance `dz` (meter).
    ///
    /// The combination of primitives is selected from the regions of the start and end position
    /// with respect to the pilot beam. Afterwards the current position is exactly `z + dz`.
    ///
    /// # Errors
    ///
    /// This function will return an error if `dz` is not finite or a primitive finds the
    /// wavefront in an inconsistent state.
    pub fn propagate(&mut self, dz: f64) -> PopResult<PropagatorKind> {
        if !dz.is_finite() {
            return Err(PopError::Degenerate(
                "propagation distance must be finite".into(),
            ));
        }
        let z1 = self.pilot.z();
        let z2 = z1 + dz;
        let zw0 = self.pilot.zw0();
        let kind = PropagatorKind::from_regions(
            self.pilot.region_at(z1, self.rayleigh_factor),
            self.pilot.region_at(z2, self.rayleigh_factor),
        );
        debug!("propagate {dz:.6e} m using {kind}");
        match kind {
            PropagatorKind::InsideToInside => self.ptp(dz)?,
            PropagatorKind::InsideToOutside => {
                self.ptp(zw0 - z1)?;
                self.wts(z2 - zw0)?;
            }
            PropagatorKind::OutsideToInside => {
                self.stw(zw0 - z1)?;
                self.ptp(z2 - zw0)?;
            }
            PropagatorKind::OutsideToOutside => {
                self.stw(zw0 - z1)?;
                self.wts(z2 - zw0)?;
            }
        }
        self.pilot.set_z(z2);
        self.last_propagator = Some(kind);
        Ok(kind)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::meter;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use assert_matches::assert_matches;

    fn wavefront() -> Wavefront {
        Wavefront::new(meter!(0.01), meter!(1.0e-6), 64, 4).unwrap()
    }
    #[test]
    fn kind_display() {
        assert_eq!(
            PropagatorKind::from_regions(Region::Inside, Region::Inside).to_string(),
            "II"
        );
        assert_eq!(PropagatorKind::InsideToOutside.to_string(), "IO");
        assert_eq!(PropagatorKind::OutsideToInside.to_string(), "OI");
        assert_eq!(PropagatorKind::OutsideToOutside.to_string(), "OO");
        assert_eq!(PropagatorKind::OutsideToInside.start(), Region::Outside);
        assert_eq!(PropagatorKind::OutsideToInside.end(), Region::Inside);
    }
    #[test]
    fn plane_wave_stays_plane() {
        let mut wf = wavefront();
        let kind = wf.propagate(1.0).unwrap();
        assert_eq!(kind, PropagatorKind::InsideToInside);
        assert_eq!(wf.last_propagator(), Some(kind));
        assert_eq!(wf.z(), 1.0);
        // a uniform field is an eigenfunction of free space propagation (zero frequency only)
        for v in wf.field().iter() {
            assert_abs_diff_eq!(v.norm(), 1.0, epsilon = 1e-9);
        }
        assert_eq!(wf.dx(), 0.01 * 4.0 / 64.0);
    }
    #[test]
    fn negligible_step() {
        let mut wf = wavefront();
        let before = wf.field().clone();
        wf.propagate(1.0e-10).unwrap();
        assert_eq!(wf.field(), &before);
        assert_eq!(wf.z(), 1.0e-10);
    }
    #[test]
    fn primitive_preconditions() {
        let mut wf = wavefront();
        assert_matches!(wf.stw(1.0), Err(PopError::Degenerate(_)));
        wf.curvature = 1.0;
        assert_matches!(wf.ptp(1.0), Err(PopError::Degenerate(_)));
        assert_matches!(wf.wts(1.0), Err(PopError::Degenerate(_)));
        assert_matches!(wf.propagate(f64::NAN), Err(PopError::Degenerate(_)));
    }
    #[test]
    fn far_field_resampling() {
        let mut wf = wavefront();
        let zr = wf.zr();
        let dx = wf.dx();
        let kind = wf.propagate(3.0 * zr).unwrap();
        assert_eq!(kind, PropagatorKind::InsideToOutside);
        assert_relative_eq!(wf.z(), 3.0 * zr);
        assert_relative_eq!(wf.curvature(), 1.0 / (3.0 * zr));
        assert_relative_eq!(wf.dx(), 1.0e-6 * 3.0 * zr / (64.0 * dx));
        assert_relative_eq!(wf.dy(), wf.dx());
        // and back to the waist
        let kind = wf.propagate(-3.0 * zr).unwrap();
        assert_eq!(kind, PropagatorKind::OutsideToInside);
        assert_eq!(wf.curvature(), 0.0);
        assert_relative_eq!(wf.dx(), dx);
        assert_abs_diff_eq!(wf.z(), 0.0);
    }
    #[test]
    fn energy_is_conserved() {
        let mut wf = wavefront();
        wf.make_stop().unwrap();
        let zr = wf.zr();
        wf.propagate(0.5 * zr).unwrap();
        assert_relative_eq!(wf.total_power(), 1.0, epsilon = 1e-9);
        wf.propagate(5.0 * zr).unwrap();
        assert_relative_eq!(wf.total_power(), 1.0, epsilon = 1e-9);
        wf.propagate(3.0 * zr).unwrap();
        assert_eq!(wf.last_propagator(), Some(PropagatorKind::OutsideToOutside));
        assert_relative_eq!(wf.total_power(), 1.0, epsilon = 1e-9);
    }
}
