#![warn(missing_docs)]
//! Global parameters of a single propagation run.
use log::warn;
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

use crate::error::{PopError, PopResult};

/// Allowed zoom factors (ratio of grid width to beam diameter).
pub const ALLOWED_ZOOMS: [usize; 5] = [1, 2, 4, 8, 16];
/// Smallest allowed grid size.
pub const MIN_GRID_SIZE: usize = 64;
/// Largest allowed grid size.
pub const MAX_GRID_SIZE: usize = 4096;

/// Parameters of one propagation run: one wavelength and one field.
///
/// The propagator switches between the near and the far field regime at `rayleigh_factor`
/// times the Rayleigh distance of the pilot beam (default 1). Set a factor of 2 with
/// [`RunParameters::with_rayleigh_factor`] to reproduce runs with the classic two Rayleigh
/// distance threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    wavelength: Length,
    pupil_diameter: Length,
    grid_size: usize,
    zoom: usize,
    /// sagittal (x) field angle in degrees
    #[serde(default)]
    field_x: f64,
    /// tangential (y) field angle in degrees
    #[serde(default)]
    field_y: f64,
    /// ambient temperature in deg C
    #[serde(default = "default_temperature")]
    temperature: f64,
    /// ambient pressure in atm
    #[serde(default = "default_pressure")]
    pressure: f64,
    #[serde(default = "default_rayleigh_factor")]
    rayleigh_factor: f64,
}

const fn default_temperature() -> f64 {
    20.0
}
const fn default_pressure() -> f64 {
    1.0
}
const fn default_rayleigh_factor() -> f64 {
    1.0
}

impl RunParameters {
    /// Create new run parameters for an on-axis field at 20 deg C and 1 atm.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///  - the wavelength or the pupil diameter is not positive
    ///  - the grid size is not a power of two in the range 64..=4096
    ///  - the zoom is not one of [`ALLOWED_ZOOMS`]
    pub fn new(
        wavelength: Length,
        pupil_diameter: Length,
        grid_size: usize,
        zoom: usize,
    ) -> PopResult<Self> {
        let params = Self {
            wavelength,
            pupil_diameter,
            grid_size,
            zoom,
            field_x: 0.0,
            field_y: 0.0,
            temperature: default_temperature(),
            pressure: default_pressure(),
            rayleigh_factor: default_rayleigh_factor(),
        };
        params.validate()?;
        if zoom == 1 {
            warn!("zoom is 1: the beam fills the whole grid and the far field is not Nyquist sampled");
        }
        Ok(params)
    }
    /// Check all parameters.
    ///
    /// # Errors
    ///
    /// see [`RunParameters::new`], [`RunParameters::with_field_angles`],
    /// [`RunParameters::with_ambient`] and [`RunParameters::with_rayleigh_factor`]
    pub fn validate(&self) -> PopResult<()> {
        let wl = self.wavelength.get::<meter>();
        if !wl.is_normal() || wl < 0.0 {
            return Err(PopError::Configuration("wavelength must be > 0".into()));
        }
        let d = self.pupil_diameter.get::<meter>();
        if !d.is_normal() || d < 0.0 {
            return Err(PopError::Configuration(
                "pupil diameter must be > 0".into(),
            ));
        }
        if !self.grid_size.is_power_of_two()
            || !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&self.grid_size)
        {
            return Err(PopError::Configuration(format!(
                "grid size {} not allowed. Allowed values are powers of two from {MIN_GRID_SIZE} to {MAX_GRID_SIZE}",
                self.grid_size
            )));
        }
        if !ALLOWED_ZOOMS.contains(&self.zoom) {
            return Err(PopError::Configuration(format!(
                "zoom {} not allowed. Allowed values are {ALLOWED_ZOOMS:?}",
                self.zoom
            )));
        }
        if !(self.field_x.is_finite() && self.field_y.is_finite())
            || self.field_x.abs() >= 90.0
            || self.field_y.abs() >= 90.0
        {
            return Err(PopError::Configuration(
                "field angles must lie within (-90, 90) degrees".into(),
            ));
        }
        if !self.temperature.is_finite() || !self.pressure.is_finite() || self.pressure < 0.0 {
            return Err(PopError::Configuration(
                "ambient temperature and pressure must be finite (pressure >= 0)".into(),
            ));
        }
        if !self.rayleigh_factor.is_normal() || self.rayleigh_factor < 0.0 {
            return Err(PopError::Configuration(
                "Rayleigh factor must be > 0".into(),
            ));
        }
        Ok(())
    }
    /// Set the field angles (degrees) in the sagittal (x) and tangential (y) plane.
    ///
    /// # Errors
    ///
    /// This function will return an error if an angle is not finite or its magnitude is 90
    /// degrees or more.
    pub fn with_field_angles(mut self, sagittal: f64, tangential: f64) -> PopResult<Self> {
        self.field_x = sagittal;
        self.field_y = tangential;
        self.validate()?;
        Ok(self)
    }
    /// Set the ambient temperature (deg C) and pressure (atm).
    ///
    /// # Errors
    ///
    /// This function will return an error if a value is not finite or the pressure is negative.
    pub fn with_ambient(mut self, temperature: f64, pressure: f64) -> PopResult<Self> {
        self.temperature = temperature;
        self.pressure = pressure;
        self.validate()?;
        Ok(self)
    }
    /// Set the multiple of the Rayleigh distance separating the near from the far field regime.
    ///
    /// # Errors
    ///
    /// This function will return an error if the factor is not positive and finite.
    pub fn with_rayleigh_factor(mut self, rayleigh_factor: f64) -> PopResult<Self> {
        self.rayleigh_factor = rayleigh_factor;
        self.validate()?;
        Ok(self)
    }
    /// Vacuum wavelength.
    #[must_use]
    pub const fn wavelength(&self) -> Length {
        self.wavelength
    }
    /// Diameter of the entrance pupil.
    #[must_use]
    pub const fn pupil_diameter(&self) -> Length {
        self.pupil_diameter
    }
    /// Number of samples along each axis.
    #[must_use]
    pub const fn grid_size(&self) -> usize {
        self.grid_size
    }
    /// Zoom factor.
    #[must_use]
    pub const fn zoom(&self) -> usize {
        self.zoom
    }
    /// Field angles `(sagittal, tangential)` in degrees.
    #[must_use]
    pub const fn field_angles(&self) -> (f64, f64) {
        (self.field_x, self.field_y)
    }
    /// Chief ray slope in the sagittal plane.
    #[must_use]
    pub fn sagittal_slope(&self) -> f64 {
        self.field_x.to_radians().tan()
    }
    /// Chief ray slope in the tangential plane.
    #[must_use]
    pub fn tangential_slope(&self) -> f64 {
        self.field_y.to_radians().tan()
    }
    /// Ambient temperature in deg C.
    #[must_use]
    pub const fn temperature(&self) -> f64 {
        self.temperature
    }
    /// Ambient pressure in atm.
    #[must_use]
    pub const fn pressure(&self) -> f64 {
        self.pressure
    }
    /// Multiple of the Rayleigh distance used for the regime selection.
    #[must_use]
    pub const fn rayleigh_factor(&self) -> f64 {
        self.rayleigh_factor
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        micrometer, millimeter, utils::test_helper::test_helper::check_warnings,
    };
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    #[test]
    fn new() {
        let p = RunParameters::new(micrometer!(3.0), millimeter!(10.0), 512, 4).unwrap();
        assert_eq!(p.wavelength(), micrometer!(3.0));
        assert_eq!(p.pupil_diameter(), millimeter!(10.0));
        assert_eq!(p.grid_size(), 512);
        assert_eq!(p.zoom(), 4);
        assert_eq!(p.field_angles(), (0.0, 0.0));
        assert_eq!(p.temperature(), 20.0);
        assert_eq!(p.pressure(), 1.0);
        assert_eq!(p.rayleigh_factor(), 1.0);
    }
    #[test]
    fn new_wrong() {
        assert_matches!(
            RunParameters::new(micrometer!(0.0), millimeter!(10.0), 512, 4),
            Err(PopError::Configuration(_))
        );
        assert!(RunParameters::new(micrometer!(1.0), millimeter!(-1.0), 512, 4).is_err());
        assert!(RunParameters::new(micrometer!(1.0), millimeter!(1.0), 32, 4).is_err());
        assert!(RunParameters::new(micrometer!(1.0), millimeter!(1.0), 8192, 4).is_err());
        assert!(RunParameters::new(micrometer!(1.0), millimeter!(1.0), 500, 4).is_err());
        assert!(RunParameters::new(micrometer!(1.0), millimeter!(1.0), 512, 3).is_err());
        assert!(RunParameters::new(micrometer!(1.0), millimeter!(1.0), 4096, 16).is_ok());
    }
    #[test]
    fn zoom_one_warns() {
        testing_logger::setup();
        RunParameters::new(micrometer!(1.0), millimeter!(1.0), 64, 1).unwrap();
        check_warnings(vec![
            "zoom is 1: the beam fills the whole grid and the far field is not Nyquist sampled",
        ]);
    }
    #[test]
    fn field_angles() {
        let p = RunParameters::new(micrometer!(1.0), millimeter!(1.0), 64, 2)
            .unwrap()
            .with_field_angles(0.0, 45.0)
            .unwrap();
        assert_relative_eq!(p.tangential_slope(), 1.0);
        assert_eq!(p.sagittal_slope(), 0.0);
        let p = RunParameters::new(micrometer!(1.0), millimeter!(1.0), 64, 2).unwrap();
        assert!(p.clone().with_field_angles(90.0, 0.0).is_err());
        assert!(p.with_field_angles(f64::NAN, 0.0).is_err());
    }
    #[test]
    fn ambient() {
        let p = RunParameters::new(micrometer!(1.0), millimeter!(1.0), 64, 2).unwrap();
        let p2 = p.clone().with_ambient(-218.0, 0.0).unwrap();
        assert_eq!(p2.temperature(), -218.0);
        assert!(p.with_ambient(20.0, -1.0).is_err());
    }
    #[test]
    fn rayleigh_factor() {
        let p = RunParameters::new(micrometer!(1.0), millimeter!(1.0), 64, 2).unwrap();
        let p2 = p.clone().with_rayleigh_factor(2.0).unwrap();
        assert_eq!(p2.rayleigh_factor(), 2.0);
        assert_matches!(
            p.clone().with_rayleigh_factor(0.0),
            Err(PopError::Configuration(_))
        );
        assert!(p.with_rayleigh_factor(f64::INFINITY).is_err());
    }
}
