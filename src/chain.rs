#![warn(missing_docs)]
//! The optical chain: surfaces prepared for one wavelength.
//!
//! The chain builder tracks the refractive index of the current medium (1.0 behind the entrance
//! pupil, negative after an odd number of mirrors) and computes the sagittal and tangential
//! [`Abcd`] matrices of every surface. The resulting [`OpticalChain`] is consumed read-only by
//! the propagation driver and the ray trace.
use log::{debug, info};
use uom::si::{f64::Length, length::meter};

use crate::{
    abcd::Abcd,
    aberration::{GridSagSurface, ZernikeSurface},
    aperture::Aperture,
    coordinate_break::CoordinateBreak,
    error::{PopError, PopResult},
    refractive_index::MaterialLookup,
    run_parameters::RunParameters,
    surface::{SurfaceDescription, SurfaceKind, MIRROR},
};
#[cfg(feature = "psd")]
use crate::aberration::PsdSurface;

/// Operation performed on the wavefront at a surface (besides aperture, stop and ABCD).
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOperation {
    /// entrance pupil: no operation
    Init,
    /// re-reference the chief ray
    CoordinateBreak(CoordinateBreak),
    /// only aperture and ray transfer matrices
    Optics,
    /// add a Zernike wavefront error
    Zernike(ZernikeSurface),
    /// add a random PSD wavefront error
    #[cfg(feature = "psd")]
    Psd(PsdSurface),
    /// add the wavefront error of a sag map
    GridSag(GridSagSurface),
}

/// A surface of an [`OpticalChain`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChainElement {
    index: usize,
    name: String,
    operation: SurfaceOperation,
    aperture: Aperture,
    ignore: bool,
    stop: bool,
    save: bool,
    sagittal: Abcd,
    tangential: Abcd,
    n1: f64,
    n2: f64,
}

impl ChainElement {
    /// Position of this surface in the surface list.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
    /// Name of this surface.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Operation performed at this surface.
    #[must_use]
    pub const fn operation(&self) -> &SurfaceOperation {
        &self.operation
    }
    /// Aperture of this surface.
    #[must_use]
    pub const fn aperture(&self) -> &Aperture {
        &self.aperture
    }
    /// Returns `true` if this surface is skipped.
    #[must_use]
    pub const fn ignore(&self) -> bool {
        self.ignore
    }
    /// Returns `true` if the field is normalized at this surface.
    #[must_use]
    pub const fn stop(&self) -> bool {
        self.stop
    }
    /// Returns `true` if the field at this surface is kept.
    #[must_use]
    pub const fn save(&self) -> bool {
        self.save
    }
    /// Sagittal ray transfer matrix to the next surface.
    #[must_use]
    pub const fn sagittal(&self) -> &Abcd {
        &self.sagittal
    }
    /// Tangential ray transfer matrix to the next surface.
    #[must_use]
    pub const fn tangential(&self) -> &Abcd {
        &self.tangential
    }
    /// Refractive indices `(n1, n2)` in front of and behind this surface.
    ///
    /// A negative index denotes propagation towards `-z`.
    #[must_use]
    pub const fn indices(&self) -> (f64, f64) {
        (self.n1, self.n2)
    }
}

/// Sequence of surfaces prepared for one wavelength.
#[derive(Debug, Clone, PartialEq)]
pub struct OpticalChain {
    wavelength: Length,
    elements: Vec<ChainElement>,
}

fn length_or_zero(value: Option<Length>) -> f64 {
    value
        .map(|v| v.get::<meter>())
        .filter(|v| v.is_finite())
        .unwrap_or_default()
}

impl OpticalChain {
    /// Build the chain of the given surfaces for the wavelength and ambient conditions of the
    /// given run parameters.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///  - the first non-ignored surface is not INIT or INIT appears again
    ///  - a material is unknown to the material lookup
    ///  - parameters of a surface are invalid
    pub fn build(
        surfaces: &[SurfaceDescription],
        params: &RunParameters,
        materials: &dyn MaterialLookup,
    ) -> PopResult<Self> {
        let wavelength = params.wavelength();
        info!(
            "build optical chain for wavelength {:.4} um",
            wavelength.get::<meter>() * 1.0e6
        );
        let mut n1: Option<f64> = None;
        let mut elements = Vec::with_capacity(surfaces.len());
        for (index, surface) in surfaces.iter().enumerate() {
            let element = Self::build_element(index, surface, n1, params, materials)
                .map_err(|e| e.at_surface(index))?;
            if !element.ignore {
                n1 = Some(element.n2);
            }
            elements.push(element);
        }
        if n1.is_none() {
            return Err(PopError::Configuration(
                "optical chain without INIT surface".into(),
            ));
        }
        Ok(Self {
            wavelength,
            elements,
        })
    }
    fn build_element(
        index: usize,
        surface: &SurfaceDescription,
        n1: Option<f64>,
        params: &RunParameters,
        materials: &dyn MaterialLookup,
    ) -> PopResult<ChainElement> {
        let mut element = ChainElement {
            index,
            name: surface.name().to_owned(),
            operation: SurfaceOperation::Optics,
            aperture: surface.kind().aperture().cloned().unwrap_or_default(),
            ignore: surface.ignore(),
            stop: surface.stop(),
            save: surface.save(),
            sagittal: Abcd::default(),
            tangential: Abcd::default(),
            n1: n1.unwrap_or(1.0),
            n2: n1.unwrap_or(1.0),
        };
        if surface.ignore() {
            debug!("surface {index} ({}) ignored", surface.name());
            return Ok(element);
        }
        let kind = surface.kind();
        let thickness = kind.thickness();
        let (sagittal, tangential, n1, n2) = match (kind, n1) {
            (SurfaceKind::Init(_), None) => {
                surface.pupil_diameter()?;
                element.operation = SurfaceOperation::Init;
                (Abcd::default(), Abcd::default(), 1.0, 1.0)
            }
            (SurfaceKind::Init(_), Some(_)) => {
                return Err(PopError::Configuration(
                    "INIT may only appear once".into(),
                ))
            }
            (_, None) => {
                return Err(PopError::Configuration(
                    "INIT is not the first surface".into(),
                ))
            }
            (SurfaceKind::CoordinateBreak(cb), Some(n1)) => {
                element.operation = SurfaceOperation::CoordinateBreak(cb.geometry.clone());
                let abcd = Abcd::new(thickness, 0.0, n1, n1, 1.0)?;
                (abcd, abcd, n1, n1)
            }
            (SurfaceKind::Standard(std), Some(n1)) => {
                let n2 = match std.material.as_deref().map(str::trim) {
                    Some(MIRROR) => -n1,
                    Some(glass) if !glass.is_empty() => {
                        let (_, n_oper) = materials.refractive_indices(
                            params.wavelength(),
                            glass,
                            params.temperature(),
                            params.pressure(),
                        )?;
                        n_oper * n1.signum()
                    }
                    _ => n1.signum(),
                };
                #[allow(clippy::float_cmp)]
                let curvature = if n1 == n2 {
                    0.0
                } else {
                    let radius = length_or_zero(std.radius);
                    if radius == 0.0 {
                        0.0
                    } else {
                        1.0 / radius
                    }
                };
                let abcd = Abcd::new(thickness, curvature, n1, n2, 1.0)?;
                (abcd, abcd, n1, n2)
            }
            (SurfaceKind::ParaxialLens(lens), Some(n1)) => {
                let focal_length = lens.focal_length.get::<meter>();
                if focal_length == 0.0 || focal_length.is_nan() {
                    return Err(PopError::Configuration(
                        "focal length of a paraxial lens must not be zero".into(),
                    ));
                }
                let curvature = if focal_length.is_finite() {
                    1.0 / focal_length
                } else {
                    0.0
                };
                let abcd = Abcd::new(thickness, curvature, n1, n1, 1.0)?;
                (abcd, abcd, n1, n1)
            }
            (SurfaceKind::Abcd(explicit), Some(n1)) => {
                let translation = Abcd::new(thickness, 0.0, n1, n1, 1.0)?;
                let [a, b, c, d] = explicit.sagittal;
                let sagittal = translation * Abcd::from_elements(a, b, c, d)?;
                let [a, b, c, d] = explicit.tangential;
                let tangential = translation * Abcd::from_elements(a, b, c, d)?;
                (sagittal, tangential, n1, n1)
            }
            (SurfaceKind::Zernike(zernike), Some(n1)) => {
                zernike.validate()?;
                element.operation = SurfaceOperation::Zernike(zernike.clone());
                let abcd = Abcd::new(0.0, 0.0, n1, n1, 1.0)?;
                (abcd, abcd, n1, n1)
            }
            #[cfg(feature = "psd")]
            (SurfaceKind::Psd(psd), Some(n1)) => {
                psd.validate()?;
                element.operation = SurfaceOperation::Psd(psd.clone());
                let abcd = Abcd::new(0.0, 0.0, n1, n1, 1.0)?;
                (abcd, abcd, n1, n1)
            }
            (SurfaceKind::GridSag(sag), Some(n1)) => {
                sag.validate()?;
                element.operation = SurfaceOperation::GridSag(sag.clone());
                let abcd = Abcd::new(0.0, 0.0, n1, n1, 1.0)?;
                (abcd, abcd, n1, n1)
            }
        };
        element.sagittal = sagittal.with_signs(n1, n2);
        element.tangential = tangential.with_signs(n1, n2);
        element.n1 = n1;
        element.n2 = n2;
        debug!(
            "surface {index} ({}): {} n1={n1:.6} n2={n2:.6}",
            element.name,
            kind.type_name()
        );
        Ok(element)
    }
    /// Wavelength this chain was built for.
    #[must_use]
    pub const fn wavelength(&self) -> Length {
        self.wavelength
    }
    /// All surfaces (including ignored ones).
    #[must_use]
    pub fn elements(&self) -> &[ChainElement] {
        &self.elements
    }
    /// Number of surfaces (including ignored ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }
    /// Returns `true` if the chain has no surfaces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
    /// Iterator over the surfaces that take part in the propagation.
    pub fn active_elements(&self) -> impl Iterator<Item = &ChainElement> {
        self.elements.iter().filter(|e| !e.ignore)
    }
    /// Cumulative sagittal and tangential matrices of the whole chain.
    #[must_use]
    pub fn system_abcd(&self) -> (Abcd, Abcd) {
        self.active_elements()
            .fold((Abcd::default(), Abcd::default()), |(s, t), e| {
                (e.sagittal * s, e.tangential * t)
            })
    }
    /// Effective focal length of the whole chain (sagittal plane), infinite for an afocal
    /// system.
    ///
    /// # Errors
    ///
    /// This function will return an error if the system matrix cannot be decomposed.
    pub fn effective_focal_length(&self) -> PopResult<f64> {
        self.system_abcd().0.focal_length()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        aberration::ZernikeOrdering,
        meter, micrometer, millimeter,
        refractive_index::GlassCatalog,
        surface::{AbcdSurface, CoordinateBreakSurface, ParaxialLensSurface, StandardSurface},
    };
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;

    fn params() -> RunParameters {
        RunParameters::new(micrometer!(1.0), millimeter!(10.0), 64, 4).unwrap()
    }
    fn init() -> SurfaceDescription {
        SurfaceDescription::init(millimeter!(10.0)).unwrap()
    }
    fn lens(f: f64, t: f64) -> SurfaceDescription {
        SurfaceDescription::new(
            "lens",
            SurfaceKind::ParaxialLens(ParaxialLensSurface {
                focal_length: meter!(f),
                thickness: Some(meter!(t)),
                aperture: Aperture::None,
            }),
        )
    }
    fn standard(radius: Option<f64>, t: f64, material: Option<&str>) -> SurfaceDescription {
        SurfaceDescription::new(
            "std",
            SurfaceKind::Standard(StandardSurface {
                radius: radius.map(|r| meter!(r)),
                thickness: Some(meter!(t)),
                material: material.map(str::to_owned),
                aperture: Aperture::None,
            }),
        )
    }
    #[test]
    fn init_required() {
        let catalog = GlassCatalog::default();
        assert_matches!(
            OpticalChain::build(&[], &params(), &catalog),
            Err(PopError::Configuration(_))
        );
        let e = OpticalChain::build(&[lens(1.0, 1.0), init()], &params(), &catalog).unwrap_err();
        assert_eq!(e.surface_index(), Some(0));
        let e = OpticalChain::build(&[init(), init()], &params(), &catalog).unwrap_err();
        assert_eq!(e.surface_index(), Some(1));
        // an ignored surface in front of INIT is fine
        let chain =
            OpticalChain::build(&[lens(1.0, 1.0).ignored(), init()], &params(), &catalog)
                .unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.active_elements().count(), 1);
    }
    #[test]
    fn paraxial_lens() {
        let chain = OpticalChain::build(
            &[init(), lens(0.5, 0.5).saved()],
            &params(),
            &GlassCatalog::default(),
        )
        .unwrap();
        let element = &chain.elements()[1];
        assert_eq!(element.index(), 1);
        assert!(element.save());
        assert_eq!(element.operation(), &SurfaceOperation::Optics);
        let p = element.sagittal().decompose().unwrap();
        assert_relative_eq!(p.power, 2.0);
        assert_relative_eq!(p.thickness, 0.5);
        assert_relative_eq!(chain.effective_focal_length().unwrap(), 0.5);
        assert_eq!(chain.wavelength(), micrometer!(1.0));
    }
    #[test]
    fn zero_focal_length() {
        let e = OpticalChain::build(
            &[init(), lens(0.0, 0.5)],
            &params(),
            &GlassCatalog::default(),
        )
        .unwrap_err();
        assert_matches!(e, PopError::Surface { index: 1, .. });
    }
    #[test]
    fn mirror_flips_index() {
        let chain = OpticalChain::build(
            &[
                init(),
                standard(Some(-2.0), -1.0, Some("MIRROR")),
                standard(None, 0.5, None),
            ],
            &params(),
            &GlassCatalog::default(),
        )
        .unwrap();
        let mirror = &chain.elements()[1];
        assert_eq!(mirror.indices(), (1.0, -1.0));
        assert_eq!(mirror.sagittal().cin(), 1.0);
        assert_eq!(mirror.sagittal().cout(), -1.0);
        let p = mirror.sagittal().decompose().unwrap();
        assert_relative_eq!(p.n1n2, -1.0);
        // concave mirror (R = -2 m) focuses at 1 m
        assert_relative_eq!(mirror.sagittal().cout() / p.power, 1.0);
        assert_eq!(chain.elements()[2].indices(), (-1.0, -1.0));
    }
    #[test]
    fn glass() {
        let params = params();
        let catalog = GlassCatalog::default();
        let chain = OpticalChain::build(
            &[
                init(),
                standard(Some(0.1), 0.01, Some("BK7")),
                standard(None, 0.1, None),
            ],
            &params,
            &catalog,
        )
        .unwrap();
        let (_, n_glass) = catalog
            .refractive_indices(micrometer!(1.0), "BK7", 20.0, 1.0)
            .unwrap();
        assert_eq!(chain.elements()[1].indices(), (1.0, n_glass));
        assert_eq!(chain.elements()[2].indices(), (n_glass, 1.0));
        // a flat exit face has no power
        let p = chain.elements()[2].sagittal().decompose().unwrap();
        assert_eq!(p.power, 0.0);
        assert_relative_eq!(p.n1n2, n_glass);
        let e = OpticalChain::build(
            &[init(), standard(None, 0.0, Some("UNOBTAINIUM"))],
            &params,
            &catalog,
        )
        .unwrap_err();
        assert_eq!(e.surface_index(), Some(1));
    }
    #[test]
    fn coordinate_break_and_abcd() {
        let cb = SurfaceDescription::new(
            "cb",
            SurfaceKind::CoordinateBreak(CoordinateBreakSurface {
                geometry: CoordinateBreak::default(),
                thickness: Some(meter!(0.2)),
            }),
        );
        let prism = SurfaceDescription::new(
            "prism",
            SurfaceKind::Abcd(AbcdSurface {
                sagittal: [1.0, 0.0, 0.0, 1.0],
                tangential: [2.0, 0.0, 0.0, 0.5],
                thickness: Some(meter!(0.1)),
                aperture: Aperture::None,
            }),
        );
        let chain =
            OpticalChain::build(&[init(), cb, prism], &params(), &GlassCatalog::default())
                .unwrap();
        assert_matches!(
            chain.elements()[1].operation(),
            SurfaceOperation::CoordinateBreak(_)
        );
        assert_relative_eq!(chain.elements()[1].sagittal().b(), 0.2);
        let prism = &chain.elements()[2];
        assert_relative_eq!(prism.tangential().decompose().unwrap().magnification, 2.0);
        assert_relative_eq!(prism.tangential().b(), 0.05);
        assert_relative_eq!(prism.sagittal().b(), 0.1);
        assert!(chain.effective_focal_length().unwrap().is_infinite());
    }
    #[test]
    fn zernike_is_validated() {
        let zernike = ZernikeSurface::new(vec![4], vec![1.0e-7], ZernikeOrdering::Ansi).unwrap();
        let chain = OpticalChain::build(
            &[
                init(),
                SurfaceDescription::new("z", SurfaceKind::Zernike(zernike.clone())),
            ],
            &params(),
            &GlassCatalog::default(),
        )
        .unwrap();
        assert_eq!(
            chain.elements()[1].operation(),
            &SurfaceOperation::Zernike(zernike)
        );
        assert_eq!(chain.elements()[1].sagittal(), &Abcd::default());
    }
}
