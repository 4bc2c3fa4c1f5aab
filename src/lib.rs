//! This is the documentation of the **fresnel_pop** package, a physical optics propagation
//! engine for sequential optical systems.
//!
//! A complex wavefront sampled on a square grid is propagated surface by surface through an
//! optical system using Fresnel diffraction. An analytic Gaussian pilot beam decides, for every
//! propagation step, whether the near field (constant sampling) or the far field (expanding
//! sampling) propagator applies. Optics are described by paraxial ray transfer (ABCD) matrices
//! while wavefront errors (Zernike polynomials, random surface roughness, gridded sag maps) are
//! applied as phase screens.
//!
//! The usual workflow is
//!  - load a [`SystemDocument`] from a YAML file (or build the surface list in code),
//!  - build an [`OpticalChain`](chain::OpticalChain) for a wavelength,
//!  - [`run`](driver::run) the propagation and inspect the saved
//!    [`SurfaceOutput`](output::SurfaceOutput)s.
#![allow(clippy::module_name_repetitions)]

pub mod abcd;
pub mod aberration;
pub mod aperture;
pub mod chain;
pub mod console;
pub mod coordinate_break;
pub mod document;
pub mod driver;
pub mod error;
pub mod output;
pub mod raytrace;
pub mod refractive_index;
pub mod reporter;
pub mod run_parameters;
pub mod surface;
pub mod utils;
pub mod wavefront;

pub use document::SystemDocument;

/// Return the version information of the currently built `fresnel_pop` library.
#[must_use]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_owned()
}
