//! Module for handling the refractive index of optical materials.
//!
//! Besides the dispersion models this module provides the material lookup used when an
//! optical chain is built for a given wavelength: [`MaterialLookup`] maps a material name,
//! the ambient temperature and the pressure onto the pair `(n_ref, n_oper)` of refractive
//! indices at the glass reference temperature and at the operating temperature.
#![warn(missing_docs)]
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::micrometer};

pub mod glass_catalog;
pub mod refr_index_const;
pub mod refr_index_sellmeier1;

pub use glass_catalog::{Glass, GlassCatalog, GlassData, MaterialLookup};
pub use refr_index_const::{refr_index_vaccuum, RefrIndexConst};
pub use refr_index_sellmeier1::RefrIndexSellmeier1;

use crate::error::{PopError, PopResult};

/// Available models for the calculation of refractive index
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum RefractiveIndexType {
    /// Trivial model returning a wavelength-independant constant
    Const(RefrIndexConst),
    /// Sellmeier 1 model
    Sellmeier1(RefrIndexSellmeier1),
}

impl RefractiveIndexType {
    /// Get the refractive index value of the [`RefractiveIndexType`] for the given wavelength.
    ///
    /// # Errors
    ///
    /// This function returns an error if the the refractive index could not be calculated e.g.:
    ///   - the given wavelength is at a pole of the model
    ///   - the model would calculate a value below 1.0, NaN or infinity
    pub fn get_refractive_index(&self, wavelength: Length) -> PopResult<f64> {
        let refr_index = match self {
            Self::Const(refr_index_const) => refr_index_const.get_refractive_index(wavelength)?,
            Self::Sellmeier1(refr_index_sellmeier1) => {
                refr_index_sellmeier1.get_refractive_index(wavelength)?
            }
        };
        if refr_index < 1.0 || !refr_index.is_finite() {
            return Err(PopError::Configuration(
                "refractive index calculated by model is <1.0 or not finite".into(),
            ));
        }
        Ok(refr_index)
    }
}

impl Display for RefractiveIndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Const(_) => write!(f, "Constant"),
            Self::Sellmeier1(_) => write!(f, "Sellmeier equation"),
        }
    }
}
/// All refractive index models must implement this trait.
pub trait RefractiveIndex {
    /// Get the refractive index value of the current model for the given wavelength.
    ///
    /// # Errors
    ///
    /// This function returns an error if the the refractive index could not be calculated.
    fn get_refractive_index(&self, wavelength: Length) -> PopResult<f64>;
    /// Create a corresponding [`RefractiveIndexType`] value.
    fn to_enum(&self) -> RefractiveIndexType;
}

/// Refractive index of air at the given temperature (deg C) and relative pressure (atm).
///
/// Kohlrausch formula: `n_ref = 1 + 1e-8 (6432.8 + 2949810 l^2/(146 l^2 - 1) + 25540 l^2/(41 l^2 - 1))`
/// (`l` in micron), scaled to `1 + (n_ref - 1) P / (1 + 3.4785e-3 (T - 15))`. A pressure of zero
/// models vacuum.
#[must_use]
pub fn refr_index_air(wavelength: Length, temperature: f64, pressure: f64) -> f64 {
    let l_sq = wavelength.get::<micrometer>().powi(2);
    let n_ref = 1.0
        + 1.0e-8
            * (6432.8
                + 2_949_810.0 * l_sq / 146.0f64.mul_add(l_sq, -1.0)
                + 25540.0 * l_sq / 41.0f64.mul_add(l_sq, -1.0));
    1.0 + (n_ref - 1.0) * pressure / 3.4785e-3f64.mul_add(temperature - 15.0, 1.0)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::micrometer;
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    #[test]
    fn air_index() {
        let n = refr_index_air(micrometer!(0.55), 15.0, 1.0);
        assert!(n > 1.000_27 && n < 1.000_29);
        assert_eq!(refr_index_air(micrometer!(0.55), 15.0, 0.0), 1.0);
        // colder air is denser
        assert!(refr_index_air(micrometer!(0.55), -200.0, 1.0) > n);
    }
    #[test]
    fn model_dispatch() {
        let c = RefractiveIndexType::Const(RefrIndexConst::new(1.5).unwrap());
        assert_relative_eq!(c.get_refractive_index(micrometer!(1.0)).unwrap(), 1.5);
        assert_eq!(format!("{c}"), "Constant");
        let s = RefractiveIndexType::Sellmeier1(RefrIndexSellmeier1::new(
            1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        ));
        assert_relative_eq!(
            s.get_refractive_index(micrometer!(1.0)).unwrap(),
            2.0_f64.sqrt()
        );
        assert_eq!(format!("{s}"), "Sellmeier equation");
        let pole = RefractiveIndexType::Sellmeier1(RefrIndexSellmeier1::new(
            1.0, 0.0, 0.0, 1.0, 0.0, 0.0,
        ));
        assert_matches!(
            pole.get_refractive_index(micrometer!(1.0)),
            Err(PopError::Configuration(_))
        );
    }
}
