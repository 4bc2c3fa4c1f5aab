#![warn(missing_docs)]
//! Catalogue of optical glasses used by the chain builder.
use std::collections::HashMap;

use log::debug;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use uom::si::f64::Length;

use super::{refr_index_air, RefrIndexSellmeier1, RefractiveIndex};
use crate::error::{PopError, PopResult};

/// Material lookup consumed by the optical chain builder.
///
/// Maps `(wavelength, material name, ambient temperature [deg C], pressure [atm])` onto the
/// refractive indices `(n_ref, n_oper)` at the glass reference temperature and at the operating
/// temperature. Any closure with the matching signature can act as a lookup.
pub trait MaterialLookup {
    /// Return the reference and operating refractive index of the given material.
    ///
    /// # Errors
    ///
    /// This function will return an error if the material is unknown or the index cannot be
    /// calculated for the given wavelength.
    fn refractive_indices(
        &self,
        wavelength: Length,
        material: &str,
        temperature: f64,
        pressure: f64,
    ) -> PopResult<(f64, f64)>;
}

impl<F> MaterialLookup for F
where
    F: Fn(Length, &str, f64, f64) -> PopResult<(f64, f64)>,
{
    fn refractive_indices(
        &self,
        wavelength: Length,
        material: &str,
        temperature: f64,
        pressure: f64,
    ) -> PopResult<(f64, f64)> {
        self(wavelength, material, temperature, pressure)
    }
}

/// Built-in glasses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Glass {
    /// calcium fluoride
    Caf2,
    /// sapphire (ordinary ray)
    Sapphire,
    /// zinc selenide
    Znse,
    /// Schott N-BK7
    Bk7,
    /// Schott SF11
    Sf11,
    /// barium fluoride
    Baf2,
}

/// Dispersion and thermal data of a glass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlassData {
    sellmeier: RefrIndexSellmeier1,
    /// reference temperature of the dispersion data (deg C)
    reference_temperature: f64,
    /// thermal coefficient `D0` of the absolute index
    d0: f64,
}

impl GlassData {
    /// Create new glass data from a Sellmeier-1 model, its reference temperature and the thermal
    /// coefficient `D0`.
    #[must_use]
    pub const fn new(sellmeier: RefrIndexSellmeier1, reference_temperature: f64, d0: f64) -> Self {
        Self {
            sellmeier,
            reference_temperature,
            d0,
        }
    }
    /// Reference and operating refractive index.
    ///
    /// The Sellmeier index (relative to air at the reference temperature) is converted with the
    /// air index at `(T_ref, P)`. The operating index follows
    /// `n + (n^2 - 1) / (2n) * D0 * (T - T_ref)`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the dispersion model is not defined at the
    /// given wavelength.
    pub fn refractive_indices(
        &self,
        wavelength: Length,
        temperature: f64,
        pressure: f64,
    ) -> PopResult<(f64, f64)> {
        let n_rel = self.sellmeier.get_refractive_index(wavelength)?;
        let n_ref = n_rel * refr_index_air(wavelength, self.reference_temperature, pressure);
        let delta_t = temperature - self.reference_temperature;
        let n_oper = n_ref + n_ref.mul_add(n_ref, -1.0) / (2.0 * n_ref) * self.d0 * delta_t;
        Ok((n_ref, n_oper))
    }
}

impl Glass {
    /// Dispersion and thermal data of this glass.
    #[must_use]
    pub const fn data(self) -> GlassData {
        let (sellmeier, d0) = match self {
            Self::Caf2 => (
                RefrIndexSellmeier1::new(
                    0.567_588_8,
                    0.471_091_4,
                    3.848_472_3,
                    2.526_43e-3,
                    1.007_833_3e-2,
                    1_200.556,
                ),
                -2.66e-5,
            ),
            Self::Sapphire => (
                RefrIndexSellmeier1::new(
                    1.023_798,
                    1.058_264,
                    5.280_792,
                    3.775_88e-3,
                    1.225_44e-2,
                    321.361_6,
                ),
                1.8e-5,
            ),
            Self::Znse => (
                RefrIndexSellmeier1::new(
                    4.298_014_9,
                    0.627_765_57,
                    2.895_563_3,
                    3.688_819_6e-2,
                    0.143_476_258,
                    2_208.491_96,
                ),
                5.54e-5,
            ),
            Self::Bk7 => (
                RefrIndexSellmeier1::new(
                    1.039_612_12,
                    0.231_792_344,
                    1.010_469_45,
                    6.000_698_67e-3,
                    2.001_791_44e-2,
                    103.560_653,
                ),
                1.86e-6,
            ),
            Self::Sf11 => (
                RefrIndexSellmeier1::new(
                    1.738_484_03,
                    0.311_168_974,
                    1.174_908_71,
                    1.360_686_04e-2,
                    6.159_604_63e-2,
                    121.922_711,
                ),
                1.12e-5,
            ),
            Self::Baf2 => (
                RefrIndexSellmeier1::new(
                    0.643_356,
                    0.506_762,
                    3.826_1,
                    3.34e-3,
                    1.203e-2,
                    2_151.698_1,
                ),
                -4.46e-5,
            ),
        };
        GlassData::new(sellmeier, 20.0, d0)
    }
}

/// The default [`MaterialLookup`]: the built-in glasses plus user supplied ones.
#[derive(Debug, Clone, Default)]
pub struct GlassCatalog {
    custom: HashMap<String, GlassData>,
}

impl GlassCatalog {
    /// Add (or replace) a user defined glass. Names are case insensitive.
    pub fn add_glass(&mut self, name: &str, data: GlassData) {
        self.custom.insert(name.to_uppercase(), data);
    }
    /// Names of all available glasses.
    #[must_use]
    pub fn glass_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Glass::iter().map(|g| g.to_string()).collect();
        names.extend(self.custom.keys().cloned());
        names
    }
    fn glass_data(&self, material: &str) -> PopResult<GlassData> {
        let name = material.trim().to_uppercase();
        if let Some(data) = self.custom.get(&name) {
            return Ok(*data);
        }
        name.parse::<Glass>().map(Glass::data).map_err(|_| {
            PopError::Configuration(format!("glass {material} currently not supported"))
        })
    }
}

impl MaterialLookup for GlassCatalog {
    fn refractive_indices(
        &self,
        wavelength: Length,
        material: &str,
        temperature: f64,
        pressure: f64,
    ) -> PopResult<(f64, f64)> {
        let data = self.glass_data(material)?;
        debug!(
            "glass name: {material} -- T ref: {}",
            data.reference_temperature
        );
        data.refractive_indices(wavelength, temperature, pressure)
    }
}
