#![warn(missing_docs)]
//! The propagation driver.
//!
//! [`run`] walks through an [`OpticalChain`] and applies, for every surface that is not ignored:
//!  1. the coordinate break (chief ray only)
//!  2. the aperture, projected onto the plane orthogonal to the chief ray
//!  3. the stop normalization
//!  4. Zernike, PSD or grid sag wavefront errors
//!  5. the snapshot of saved surfaces
//!  6. magnification, change of medium, lens power and propagation to the next surface as
//!     given by the ray transfer matrices
//!  7. the chief ray and cumulative matrix update
//!
//! Any failure aborts the run. The error carries the index of the failing surface and no
//! partial result is returned.
use crate::{
    abcd::{Abcd, RayVector},
    aberration::Aberration,
    aperture::Aperture,
    chain::{ChainElement, OpticalChain, SurfaceOperation},
    error::{PopError, PopResult},
    output::{PropagationResult, SurfaceOutput},
    reporter::PropagationObserver,
    run_parameters::RunParameters,
    wavefront::Wavefront,
};
use uom::si::length::meter;

/// Running state of the chief ray and the system matrices.
struct ChiefRay {
    tangential: RayVector,
    sagittal: RayVector,
    cumulative_sagittal: Abcd,
    cumulative_tangential: Abcd,
}

/// Propagate a wavefront through the given optical chain.
///
/// The wavefront is created from the run parameters (pupil diameter, wavelength, grid size and
/// zoom), the chief ray starts on axis with the slopes of the field angles. Returns the
/// snapshots of all surfaces with the save flag set.
///
/// # Errors
///
/// This function will return an error if
///  - the chain was built for a different wavelength
///  - the wavefront cannot be created
///  - the processing of a surface fails ([`PopError::Surface`] naming the surface index)
pub fn run(
    params: &RunParameters,
    chain: &OpticalChain,
    observer: &mut dyn PropagationObserver,
) -> PopResult<PropagationResult> {
    let wavelength = params.wavelength().get::<meter>();
    let chain_wavelength = chain.wavelength().get::<meter>();
    if (wavelength - chain_wavelength).abs() > f64::EPSILON * wavelength {
        return Err(PopError::Configuration(format!(
            "optical chain built for {chain_wavelength:e} m but run at {wavelength:e} m"
        )));
    }
    let mut wavefront = Wavefront::from_parameters(params)?;
    let mut ray = ChiefRay {
        tangential: RayVector::new(0.0, params.tangential_slope()),
        sagittal: RayVector::new(0.0, params.sagittal_slope()),
        cumulative_sagittal: Abcd::default(),
        cumulative_tangential: Abcd::default(),
    };
    let mut result = PropagationResult::default();
    observer.run_started(wavefront.wavelength(), chain.len());
    for element in chain.elements() {
        if element.ignore() {
            observer.surface_ignored(element);
            continue;
        }
        observer.surface_started(element);
        let output = process_surface(element, &mut wavefront, &mut ray)
            .map_err(|e| e.at_surface(element.index()))?;
        observer.surface_finished(element, &wavefront);
        if let Some(output) = output {
            observer.surface_saved(&output);
            result.push(output);
        }
    }
    observer.run_finished(&wavefront);
    Ok(result)
}

fn process_surface(
    element: &ChainElement,
    wavefront: &mut Wavefront,
    ray: &mut ChiefRay,
) -> PopResult<Option<SurfaceOutput>> {
    if let SurfaceOperation::CoordinateBreak(cb) = element.operation() {
        (ray.tangential, ray.sagittal) = cb.apply(&ray.tangential, &ray.sagittal);
    }
    let aperture = element
        .aperture()
        .projected(&ray.tangential, &ray.sagittal);
    wavefront.aperture(&aperture)?;
    if element.stop() {
        wavefront.make_stop()?;
    }
    let aberration: Option<&dyn Aberration> = match element.operation() {
        SurfaceOperation::Zernike(zernike) => Some(zernike),
        #[cfg(feature = "psd")]
        SurfaceOperation::Psd(psd) => Some(psd),
        SurfaceOperation::GridSag(sag) => Some(sag),
        SurfaceOperation::Init | SurfaceOperation::CoordinateBreak(_) | SurfaceOperation::Optics => {
            None
        }
    };
    if let Some(aberration) = aberration {
        let map = aberration.wavefront_error(&wavefront.grid()?, wavefront.wz())?;
        wavefront.apply_aberration(&map)?;
    }
    let mut output = if element.save() {
        let mask = if element.aperture() == &Aperture::None {
            None
        } else {
            Some(aperture.mask(&wavefront.grid()?))
        };
        Some(SurfaceOutput::new(
            element.index(),
            element.name(),
            wavefront,
            mask,
        ))
    } else {
        None
    };
    wavefront.apply_abcd(element.sagittal(), element.tangential())?;
    ray.tangential = element.tangential().apply(&ray.tangential);
    ray.sagittal = element.sagittal().apply(&ray.sagittal);
    ray.cumulative_sagittal = *element.sagittal() * ray.cumulative_sagittal;
    ray.cumulative_tangential = *element.tangential() * ray.cumulative_tangential;
    if let Some(output) = output.as_mut() {
        output.set_cumulative(ray.cumulative_sagittal, ray.cumulative_tangential);
    }
    Ok(output)
}
