#![warn(missing_docs)]
//! Paraxial chief ray trace through an optical chain.
//!
//! This diagnostic only uses the ray transfer matrices and coordinate breaks of the chain and
//! is independent of the wavefront propagation.
use std::fmt::Display;

use log::debug;

use crate::{
    abcd::RayVector,
    chain::{OpticalChain, SurfaceOperation},
    run_parameters::RunParameters,
};

/// Chief ray position and slopes behind a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct RayTraceStep {
    /// surface index
    pub index: usize,
    /// surface name
    pub name: String,
    /// tangential `(y, u_y)` ray vector
    pub tangential: RayVector,
    /// sagittal `(x, u_x)` ray vector
    pub sagittal: RayVector,
}

impl Display for RayTraceStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "S{:02} - {:15} y:{:7.3}mm ut:{:10.3e} rad x:{:7.3}mm us:{:10.3e} rad",
            self.index,
            self.name,
            1000.0 * self.tangential[0],
            self.tangential[1],
            1000.0 * self.sagittal[0],
            self.sagittal[1]
        )
    }
}

/// Trace the chief ray of the field given in the run parameters through the chain.
///
/// The ray starts at `(x, y)` (meter) with the field slopes. Ignored surfaces are skipped.
#[must_use]
pub fn raytrace(params: &RunParameters, chain: &OpticalChain, x: f64, y: f64) -> Vec<RayTraceStep> {
    let mut tangential = RayVector::new(y, params.tangential_slope());
    let mut sagittal = RayVector::new(x, params.sagittal_slope());
    let mut steps = Vec::with_capacity(chain.len());
    for element in chain.active_elements() {
        if let SurfaceOperation::CoordinateBreak(cb) = element.operation() {
            (tangential, sagittal) = cb.apply(&tangential, &sagittal);
        }
        tangential = element.tangential().apply(&tangential);
        sagittal = element.sagittal().apply(&sagittal);
        let step = RayTraceStep {
            index: element.index(),
            name: element.name().to_owned(),
            tangential,
            sagittal,
        };
        debug!("{step}");
        steps.push(step);
    }
    steps
}
