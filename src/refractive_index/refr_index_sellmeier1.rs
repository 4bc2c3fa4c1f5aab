//! Sellmeier-1 dispersion model
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::micrometer};

use super::{RefractiveIndex, RefractiveIndexType};
use crate::error::{PopError, PopResult};

/// Sellmeier 1 model `n^2 = 1 + sum K_i l^2 / (l^2 - L_i)` with the wavelength `l` in micron.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct RefrIndexSellmeier1 {
    k1: f64,
    k2: f64,
    k3: f64,
    l1: f64,
    l2: f64,
    l3: f64,
}
impl RefrIndexSellmeier1 {
    #[must_use]
    pub const fn new(k1: f64, k2: f64, k3: f64, l1: f64, l2: f64, l3: f64) -> Self {
        Self {
            k1,
            k2,
            k3,
            l1,
            l2,
            l3,
        }
    }
}
impl RefractiveIndex for RefrIndexSellmeier1 {
    fn get_refractive_index(&self, wavelength: Length) -> PopResult<f64> {
        let lambda = wavelength.get::<micrometer>();
        let l_sq = lambda * lambda;
        let n_sq = 1.0
            + self.k1 * l_sq / (l_sq - self.l1)
            + self.k2 * l_sq / (l_sq - self.l2)
            + self.k3 * l_sq / (l_sq - self.l3);
        if !n_sq.is_finite() || n_sq < 1.0 {
            return Err(PopError::Configuration(format!(
                "Sellmeier model not defined at {lambda} micron"
            )));
        }
        Ok(n_sq.sqrt())
    }
    fn to_enum(&self) -> RefractiveIndexType {
        RefractiveIndexType::Sellmeier1(*self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nanometer;
    use approx::assert_abs_diff_eq;
    #[test]
    fn bk7() {
        let i = RefrIndexSellmeier1::new(
            1.039_612_12,
            0.231_792_344,
            1.010_469_45,
            6.000_698_67e-3,
            2.001_791_44e-2,
            103.560_653,
        );
        assert_abs_diff_eq!(
            i.get_refractive_index(nanometer!(587.6)).unwrap(),
            1.5168,
            epsilon = 1e-4
        );
        assert_eq!(i.to_enum(), RefractiveIndexType::Sellmeier1(i));
    }
}
