#![warn(missing_docs)]
//! Wavelength-independent refractive index
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

use super::{RefractiveIndex, RefractiveIndexType};
use crate::error::{PopError, PopResult};

/// Constant refractive index model
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct RefrIndexConst {
    refractive_index: f64,
}
impl RefrIndexConst {
    /// Create a new constant refractive index model.
    ///
    /// # Errors
    ///
    /// This function will return an error if the refractive index is < 1.0 or not finite.
    pub fn new(refractive_index: f64) -> PopResult<Self> {
        if refractive_index < 1.0 || !refractive_index.is_finite() {
            return Err(PopError::Configuration(
                "refractive index must be >=1.0 and finite".into(),
            ));
        }
        Ok(Self { refractive_index })
    }
}
impl RefractiveIndex for RefrIndexConst {
    fn get_refractive_index(&self, _wavelength: Length) -> PopResult<f64> {
        Ok(self.refractive_index)
    }
    fn to_enum(&self) -> RefractiveIndexType {
        RefractiveIndexType::Const(*self)
    }
}
/// Refractive index model of vacuum (n = 1.0)
#[must_use]
pub const fn refr_index_vaccuum() -> RefrIndexConst {
    RefrIndexConst {
        refractive_index: 1.0,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nanometer;
    #[test]
    fn new() {
        assert!(RefrIndexConst::new(0.99).is_err());
        assert!(RefrIndexConst::new(f64::NAN).is_err());
        assert!(RefrIndexConst::new(f64::INFINITY).is_err());
        assert!(RefrIndexConst::new(1.0).is_ok());
    }
    #[test]
    fn get_refractive_index() {
        let i = RefrIndexConst::new(1.5).unwrap();
        assert_eq!(i.get_refractive_index(nanometer!(1000.0)).unwrap(), 1.5);
        assert_eq!(
            refr_index_vaccuum()
                .get_refractive_index(nanometer!(500.0))
                .unwrap(),
            1.0
        );
        assert_eq!(i.to_enum(), RefractiveIndexType::Const(i));
    }
}
