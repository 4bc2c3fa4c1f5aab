#![warn(missing_docs)]
//! Descriptions of the surfaces of a sequential optical system.
//!
//! A [`SurfaceDescription`] is the input record of the chain builder. Its [`SurfaceKind`] is a
//! tagged union over the supported surface types, serialized with a `type` tag:
//! ```yaml
//! name: primary
//! type: Standard
//! radius: -2.0
//! thickness: -0.9
//! material: MIRROR
//! save: true
//! ```
use std::path::Path;

use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

use crate::{
    aberration::{GridSagSurface, ZernikeSurface},
    aperture::Aperture,
    coordinate_break::CoordinateBreak,
    error::{PopError, PopResult},
};
#[cfg(feature = "psd")]
use crate::aberration::PsdSurface;

/// Material name of a reflecting surface.
pub const MIRROR: &str = "MIRROR";

/// The entrance pupil of the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitSurface {
    /// entrance pupil
    pub aperture: Aperture,
}

/// A coordinate break, optionally followed by a translation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateBreakSurface {
    /// decenter and tilts
    #[serde(flatten)]
    pub geometry: CoordinateBreak,
    /// distance to the next surface
    #[serde(default)]
    pub thickness: Option<Length>,
}

/// A spherical refracting or reflecting surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardSurface {
    /// radius of curvature (flat if omitted or infinite)
    #[serde(default)]
    pub radius: Option<Length>,
    /// distance to the next surface
    #[serde(default)]
    pub thickness: Option<Length>,
    /// medium behind the surface: a glass name, [`MIRROR`] or air if omitted
    #[serde(default)]
    pub material: Option<String>,
    /// clear aperture or obscuration
    #[serde(default)]
    pub aperture: Aperture,
}

/// An ideal thin lens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParaxialLensSurface {
    /// focal length
    pub focal_length: Length,
    /// distance to the next surface
    #[serde(default)]
    pub thickness: Option<Length>,
    /// clear aperture or obscuration
    #[serde(default)]
    pub aperture: Aperture,
}

/// A surface defined by explicit ray transfer matrices, e.g. a prism.
///
/// The matrices are given as `[A, B, C, D]` (lengths in meter) and are followed by a
/// translation over the thickness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbcdSurface {
    /// sagittal (x) matrix
    pub sagittal: [f64; 4],
    /// tangential (y) matrix
    pub tangential: [f64; 4],
    /// distance to the next surface
    #[serde(default)]
    pub thickness: Option<Length>,
    /// clear aperture or obscuration
    #[serde(default)]
    pub aperture: Aperture,
}

/// The type of a surface together with its specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SurfaceKind {
    /// entrance pupil, always the first surface
    #[serde(rename = "INIT")]
    Init(InitSurface),
    /// decenter / tilt of the coordinate system
    #[serde(rename = "Coordinate Break")]
    CoordinateBreak(CoordinateBreakSurface),
    /// spherical dioptre or mirror
    Standard(StandardSurface),
    /// ideal thin lens
    #[serde(rename = "Paraxial Lens")]
    ParaxialLens(ParaxialLensSurface),
    /// explicit ray transfer matrices
    #[serde(rename = "ABCD")]
    Abcd(AbcdSurface),
    /// Zernike wavefront error
    Zernike(ZernikeSurface),
    /// random surface error from a power spectral density
    #[cfg(feature = "psd")]
    #[serde(rename = "PSD")]
    Psd(PsdSurface),
    /// wavefront error from a gridded sag map
    #[serde(rename = "Grid Sag")]
    GridSag(GridSagSurface),
}

impl Default for SurfaceKind {
    fn default() -> Self {
        Self::Standard(StandardSurface::default())
    }
}

impl SurfaceKind {
    /// Name of the surface type as used in system documents.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Init(_) => "INIT",
            Self::CoordinateBreak(_) => "Coordinate Break",
            Self::Standard(_) => "Standard",
            Self::ParaxialLens(_) => "Paraxial Lens",
            Self::Abcd(_) => "ABCD",
            Self::Zernike(_) => "Zernike",
            #[cfg(feature = "psd")]
            Self::Psd(_) => "PSD",
            Self::GridSag(_) => "Grid Sag",
        }
    }
    /// Aperture (or obscuration) applied at this surface.
    ///
    /// The pupil of an INIT surface only defines the beam and is not applied.
    #[must_use]
    pub const fn aperture(&self) -> Option<&Aperture> {
        match self {
            Self::Standard(s) => Some(&s.aperture),
            Self::ParaxialLens(s) => Some(&s.aperture),
            Self::Abcd(s) => Some(&s.aperture),
            _ => None,
        }
    }
    /// Distance to the next surface (zero if not given).
    #[must_use]
    pub fn thickness(&self) -> f64 {
        let thickness = match self {
            Self::CoordinateBreak(s) => s.thickness,
            Self::Standard(s) => s.thickness,
            Self::ParaxialLens(s) => s.thickness,
            Self::Abcd(s) => s.thickness,
            _ => None,
        };
        thickness
            .map(|t| t.get::<meter>())
            .filter(|t| t.is_finite())
            .unwrap_or_default()
    }
}

/// One entry of the surface list of an optical system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDescription {
    /// free text comment
    #[serde(default)]
    name: String,
    #[serde(flatten)]
    kind: SurfaceKind,
    /// skip this surface
    #[serde(default)]
    ignore: bool,
    /// normalize the field to unit power at this surface
    #[serde(default)]
    stop: bool,
    /// keep the field at this surface
    #[serde(default)]
    save: bool,
}

impl SurfaceDescription {
    /// Create a new surface description with all flags cleared.
    #[must_use]
    pub fn new(name: &str, kind: SurfaceKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            ignore: false,
            stop: false,
            save: false,
        }
    }
    /// Create the entrance pupil surface of a circular beam with the given diameter.
    ///
    /// # Errors
    ///
    /// This function will return an error if the diameter is not positive.
    pub fn init(diameter: Length) -> PopResult<Self> {
        let aperture = Aperture::Elliptical(crate::aperture::EllipseConfig::circle(
            diameter / 2.0,
        )?);
        Ok(Self::new("INIT", SurfaceKind::Init(InitSurface { aperture })))
    }
    /// Mark this surface as stop.
    #[must_use]
    pub const fn as_stop(mut self) -> Self {
        self.stop = true;
        self
    }
    /// Keep the field at this surface.
    #[must_use]
    pub const fn saved(mut self) -> Self {
        self.save = true;
        self
    }
    /// Skip this surface.
    #[must_use]
    pub const fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }
    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Returns the surface type and its parameters.
    #[must_use]
    pub const fn kind(&self) -> &SurfaceKind {
        &self.kind
    }
    /// Returns the ignore flag.
    #[must_use]
    pub const fn ignore(&self) -> bool {
        self.ignore
    }
    /// Returns the stop flag.
    #[must_use]
    pub const fn stop(&self) -> bool {
        self.stop
    }
    /// Returns the save flag.
    #[must_use]
    pub const fn save(&self) -> bool {
        self.save
    }
    /// Resolve relative file references (grid sag maps) against the given directory.
    #[must_use]
    pub fn resolve_paths(mut self, directory: &Path) -> Self {
        self.kind = match std::mem::take(&mut self.kind) {
            SurfaceKind::GridSag(sag) => SurfaceKind::GridSag(sag.relative_to(directory)),
            other => other,
        };
        self
    }
    /// Diameter of the entrance pupil if this is an INIT surface with an elliptical pupil
    /// (twice the larger semi axis).
    ///
    /// # Errors
    ///
    /// This function will return an error if this is an INIT surface without elliptical
    /// pupil.
    pub fn pupil_diameter(&self) -> PopResult<Option<Length>> {
        let SurfaceKind::Init(init) = &self.kind else {
            return Ok(None);
        };
        match &init.aperture {
            Aperture::Elliptical(_) if !init.aperture.is_obstruction() => {
                let (rx, ry) = init.aperture.half_widths().ok_or_else(|| {
                    PopError::Configuration("INIT pupil without semi axes".into())
                })?;
                Ok(Some(2.0 * if rx > ry { rx } else { ry }))
            }
            _ => Err(PopError::Configuration(
                "the INIT surface requires an elliptical pupil".into(),
            )),
        }
    }
}
