//! Random surface errors with a prescribed power spectral density.
//!
//! The one sided PSD reads `PSD(f) = 2A / (B + (f/f_knee)^C) / (2 pi f)` with the spatial
//! frequency `f` in cycles per meter. A realisation is generated by shaping the spectrum of
//! white gaussian noise with `sqrt(PSD)`, keeping only the band `[f_min, f_max]`. The surface
//! error is rescaled to the RMS implied by the PSD, white roughness is added and the result is
//! doubled (surface to reflected wavefront).
use log::debug;
use nalgebra::DMatrix;
use num::complex::Complex64;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

use super::{Aberration, AberrationMap};
use crate::{
    aperture::{Aperture, EllipseConfig},
    error::{PopError, PopResult},
    utils::{
        fft::{fft2_forward, fft2_inverse, fftfreq},
        griddata::SamplingGrid,
        math_utils::{mean_and_std, simpson},
    },
};

const QUADRATURE_INTERVALS: usize = 4096;

fn unit_length() -> Length {
    Length::new::<meter>(1.0)
}

/// Parameters of a PSD surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsdSurface {
    a: f64,
    #[serde(default)]
    b: f64,
    #[serde(default)]
    c: f64,
    f_knee: f64,
    f_min: f64,
    f_max: f64,
    /// rms of the white surface roughness (in units of `unit`)
    #[serde(default)]
    roughness: f64,
    #[serde(default = "unit_length")]
    unit: Length,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    support: Option<Aperture>,
}

impl PsdSurface {
    /// Create a new PSD surface.
    ///
    /// Frequencies are given in cycles per meter, the resulting surface error is in units of
    /// `unit`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the parameters are invalid (see
    /// [`PsdSurface::validate`]).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        a: f64,
        b: f64,
        c: f64,
        f_knee: f64,
        f_min: f64,
        f_max: f64,
        roughness: f64,
        unit: Length,
    ) -> PopResult<Self> {
        let psd = Self {
            a,
            b,
            c,
            f_knee,
            f_min,
            f_max,
            roughness,
            unit,
            seed: None,
            support: None,
        };
        psd.validate()?;
        Ok(psd)
    }
    /// Check the PSD parameters.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///  - a parameter is not finite
    ///  - `f_min` is not positive or `f_max <= f_min`
    ///  - `f_knee` is not positive or the roughness is negative
    pub fn validate(&self) -> PopResult<()> {
        let values = [
            self.a,
            self.b,
            self.c,
            self.f_knee,
            self.f_min,
            self.f_max,
            self.roughness,
            self.unit.get::<meter>(),
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PopError::Configuration(
                "PSD parameters must be finite".into(),
            ));
        }
        if self.f_min <= 0.0 || self.f_max <= self.f_min {
            return Err(PopError::Configuration(
                "PSD band requires 0 < f_min < f_max".into(),
            ));
        }
        if self.f_knee <= 0.0 {
            return Err(PopError::Configuration(
                "PSD knee frequency must be > 0".into(),
            ));
        }
        if self.roughness < 0.0 {
            return Err(PopError::Configuration(
                "surface roughness must be >= 0".into(),
            ));
        }
        Ok(())
    }
    /// Use a fixed random seed for reproducible realisations.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    /// Restrict the statistics and the map to the given aperture.
    #[must_use]
    pub fn with_support(mut self, support: Aperture) -> Self {
        self.support = Some(support);
        self
    }
    /// Returns the random seed, if any.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }
    fn psd(&self, f: f64) -> f64 {
        2.0 * self.a / (self.b + (f / self.f_knee).powf(self.c)) / (2.0 * std::f64::consts::PI * f)
    }
    /// RMS of the surface error implied by the PSD over the band `[f_min, f_max]`.
    ///
    /// The integral is evaluated in `ln f`.
    #[must_use]
    pub fn sfe_rms(&self) -> f64 {
        let integrand = |u: f64| {
            let f = u.exp();
            self.psd(f) * f
        };
        simpson(
            integrand,
            self.f_min.ln(),
            self.f_max.ln(),
            QUADRATURE_INTERVALS,
        )
        .max(0.0)
        .sqrt()
    }
    fn rng(&self) -> StdRng {
        self.seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
    }
}

impl Aberration for PsdSurface {
    fn wavefront_error(&self, grid: &SamplingGrid, beam_radius: f64) -> PopResult<AberrationMap> {
        self.validate()?;
        let support = match &self.support {
            Some(aperture) => aperture.support(grid),
            None => {
                let circle = EllipseConfig::circle(Length::new::<meter>(beam_radius))
                    .map_err(|_| {
                        PopError::Degenerate("PSD support radius must be positive".into())
                    })?;
                Aperture::Elliptical(circle).support(grid)
            }
        };
        let (ny, nx) = (grid.ny(), grid.nx());
        let mut rng = self.rng();
        let mut spectrum = DMatrix::<Complex64>::from_fn(ny, nx, |_, _| {
            Complex64::new(rng.sample::<f64, _>(StandardNormal), 0.0)
        });
        fft2_forward(&mut spectrum);
        let fx = fftfreq(nx, grid.dx());
        let fy = fftfreq(ny, grid.dy());
        for col in 0..nx {
            for row in 0..ny {
                let f = fx[col].hypot(fy[row]);
                if f < self.f_min || f > self.f_max {
                    spectrum[(row, col)] = Complex64::new(0.0, 0.0);
                } else {
                    spectrum[(row, col)] *= self.psd(f).sqrt();
                }
            }
        }
        fft2_inverse(&mut spectrum);
        let mut sfe = spectrum.map(|c| c.re);
        let (_, current_std) = mean_and_std(
            sfe.iter()
                .zip(support.iter())
                .filter_map(|(v, s)| s.then_some(*v)),
        );
        if current_std <= 0.0 || !current_std.is_finite() {
            return Err(PopError::Degenerate(
                "PSD band contains no sampled frequency on this grid".into(),
            ));
        }
        let target = self.sfe_rms();
        debug!("PSD surface: desired rms {target:.3e}, realised std {current_std:.3e}");
        let scale = target / current_std;
        let unit = self.unit.get::<meter>();
        sfe.apply(|v| {
            let roughness = self.roughness * rng.sample::<f64, _>(StandardNormal);
            *v = 2.0 * v.mul_add(scale, roughness) * unit;
        });
        AberrationMap::new(sfe, support)
    }
}
