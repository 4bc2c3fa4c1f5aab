#![warn(missing_docs)]
//! The description of an optical system as stored on disk.
//!
//! A [`SystemDocument`] holds the global run parameters, the list of wavelengths and field angles
//! to be simulated and the ordered surface list. Documents are read from and written to YAML:
//! ```yaml
//! general:
//!   project: two mirror telescope
//!   grid_size: 512
//!   zoom: 4
//! wavelengths: [3.0, 5.0]
//! fields:
//!   - [0.0, 0.0]
//! surfaces:
//!   - name: INIT
//!     type: INIT
//!     aperture:
//!       elliptical:
//!         half_widths: [0.5, 0.5]
//!   - name: primary
//!     type: Standard
//!     radius: -2.0
//!     thickness: -0.9
//!     material: MIRROR
//!     stop: true
//! ```
//! Lengths are given in meter, wavelengths in micron and field angles in degrees.
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

use crate::{
    chain::OpticalChain,
    error::{PopError, PopResult},
    micrometer,
    refractive_index::MaterialLookup,
    run_parameters::RunParameters,
    surface::SurfaceDescription,
};

const fn default_temperature() -> f64 {
    20.0
}
const fn default_pressure() -> f64 {
    1.0
}
const fn default_rayleigh_factor() -> f64 {
    1.0
}

/// Global parameters shared by all runs of a [`SystemDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralParameters {
    /// project name
    #[serde(default)]
    pub project: String,
    /// linear size of the simulation grid
    pub grid_size: usize,
    /// ratio of grid size to beam diameter in pixels
    pub zoom: usize,
    /// entrance pupil diameter (taken from the INIT surface if omitted)
    #[serde(default)]
    pub pupil_diameter: Option<Length>,
    /// ambient temperature (deg C)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// ambient pressure (atm)
    #[serde(default = "default_pressure")]
    pub pressure: f64,
    /// multiple of the Rayleigh distance separating near and far field (2 for the classic threshold)
    #[serde(default = "default_rayleigh_factor")]
    pub rayleigh_factor: f64,
}

impl GeneralParameters {
    /// Create general parameters at 20 deg C and 1 atm.
    #[must_use]
    pub fn new(project: &str, grid_size: usize, zoom: usize) -> Self {
        Self {
            project: project.to_owned(),
            grid_size,
            zoom,
            pupil_diameter: None,
            temperature: default_temperature(),
            pressure: default_pressure(),
            rayleigh_factor: default_rayleigh_factor(),
        }
    }
}

/// An optical system together with the wavelengths and fields to propagate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDocument {
    general: GeneralParameters,
    /// wavelengths in micron
    wavelengths: Vec<f64>,
    /// (sagittal, tangential) field angles in degrees
    #[serde(default)]
    fields: Vec<(f64, f64)>,
    surfaces: Vec<SurfaceDescription>,
}

impl SystemDocument {
    /// Create a new [`SystemDocument`] for a single wavelength (micron) and an on-axis field.
    #[must_use]
    pub fn new(general: GeneralParameters, wavelength: f64, surfaces: Vec<SurfaceDescription>) -> Self {
        Self {
            general,
            wavelengths: vec![wavelength],
            fields: Vec::new(),
            surfaces,
        }
    }
    /// Add a wavelength (micron).
    pub fn add_wavelength(&mut self, wavelength: f64) {
        self.wavelengths.push(wavelength);
    }
    /// Add a field given by its sagittal and tangential angle (degrees).
    pub fn add_field(&mut self, sagittal: f64, tangential: f64) {
        self.fields.push((sagittal, tangential));
    }
    /// Create a new [`SystemDocument`] from a YAML file at the given path.
    ///
    /// Relative paths of grid sag files are interpreted relative to the directory of the
    /// document.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the given path is not found or readable.
    ///   - the parsing / deserialization of the file failed.
    pub fn from_file(path: &Path) -> PopResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            PopError::File(format!("cannot read file {} : {}", path.display(), e))
        })?;
        let mut document = Self::from_string(&contents)?;
        if let Some(directory) = path.parent() {
            document.surfaces = document
                .surfaces
                .into_iter()
                .map(|s| s.resolve_paths(directory))
                .collect();
        }
        info!(
            "loaded system '{}' with {} surfaces from {}",
            document.general.project,
            document.surfaces.len(),
            path.display()
        );
        Ok(document)
    }
    /// Create a new [`SystemDocument`] from the given YAML string.
    ///
    /// # Errors
    ///
    /// This function will return an error if the parsing failed or the document is inconsistent
    /// (see [`SystemDocument::validate`]).
    pub fn from_string(file_string: &str) -> PopResult<Self> {
        let document: Self = serde_yaml::from_str(file_string)
            .map_err(|e| PopError::File(format!("parsing of system failed: {e}")))?;
        document.validate()?;
        Ok(document)
    }
    /// Check the wavelength and field lists.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - no wavelength is given or a wavelength is not positive
    ///   - a field angle is not finite
    pub fn validate(&self) -> PopResult<()> {
        if self.wavelengths.is_empty() {
            return Err(PopError::Configuration(
                "at least one wavelength is required".into(),
            ));
        }
        if self
            .wavelengths
            .iter()
            .any(|w| !w.is_normal() || w.is_sign_negative())
        {
            return Err(PopError::Configuration(
                "wavelengths must be positive and finite".into(),
            ));
        }
        if self
            .fields
            .iter()
            .any(|(s, t)| !s.is_finite() || !t.is_finite())
        {
            return Err(PopError::Configuration(
                "field angles must be finite".into(),
            ));
        }
        if self.surfaces.is_empty() {
            warn!("system without surfaces");
        }
        Ok(())
    }
    /// Save this [`SystemDocument`] to a YAML file with the given path.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the serialization of the document failed.
    ///   - the file path cannot be created.
    ///   - it cannot write into the file (e.g. no space).
    pub fn save_to_file(&self, path: &Path) -> PopResult<()> {
        let serialized = self.to_yaml_string()?;
        let mut output = File::create(path).map_err(|e| {
            PopError::File(format!(
                "could not create file path: {}: {}",
                path.display(),
                e
            ))
        })?;
        write!(output, "{serialized}").map_err(|e| {
            PopError::File(format!(
                "writing to file path {} failed: {}",
                path.display(),
                e
            ))
        })?;
        Ok(())
    }
    /// Return the YAML representation of this [`SystemDocument`].
    ///
    /// Enum variants with data (apertures, sag sources) are written as single key maps, the
    /// form that is accepted inside the flattened surface records.
    ///
    /// # Errors
    ///
    /// This function will return an error if the serialization fails.
    pub fn to_yaml_string(&self) -> PopResult<String> {
        let mut buffer = Vec::new();
        let mut serializer = serde_yaml::Serializer::new(&mut buffer);
        serde_yaml::with::singleton_map_recursive::serialize(self, &mut serializer)
            .map_err(|e| PopError::Other(format!("serialization of system failed: {e}")))?;
        String::from_utf8(buffer)
            .map_err(|e| PopError::Other(format!("serialization of system failed: {e}")))
    }
    /// Returns the general parameters.
    #[must_use]
    pub const fn general(&self) -> &GeneralParameters {
        &self.general
    }
    /// Returns the wavelengths.
    #[must_use]
    pub fn wavelengths(&self) -> Vec<Length> {
        self.wavelengths.iter().map(|w| micrometer!(*w)).collect()
    }
    /// Returns the `(sagittal, tangential)` field angles in degrees.
    ///
    /// A document without fields has a single on-axis field.
    #[must_use]
    pub fn fields(&self) -> Vec<(f64, f64)> {
        if self.fields.is_empty() {
            vec![(0.0, 0.0)]
        } else {
            self.fields.clone()
        }
    }
    /// Returns the surface list.
    #[must_use]
    pub fn surfaces(&self) -> &[SurfaceDescription] {
        &self.surfaces
    }
    /// Returns the entrance pupil diameter.
    ///
    /// If not given in the general parameters it is derived from the INIT surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if there is neither a pupil diameter nor an INIT
    /// surface with an elliptical pupil.
    pub fn pupil_diameter(&self) -> PopResult<Length> {
        if let Some(diameter) = self.general.pupil_diameter {
            return Ok(diameter);
        }
        for surface in self.surfaces.iter().filter(|s| !s.ignore()) {
            if let Some(diameter) = surface.pupil_diameter()? {
                return Ok(diameter);
            }
        }
        Err(PopError::Configuration(
            "cannot determine the pupil diameter: no INIT surface".into(),
        ))
    }
    /// Returns the run parameters of the given wavelength and field index.
    ///
    /// # Errors
    ///
    /// This function will return an error if an index is out of range or the parameters are
    /// invalid.
    pub fn run_parameters(&self, wavelength: usize, field: usize) -> PopResult<RunParameters> {
        let wl = self.wavelengths.get(wavelength).ok_or_else(|| {
            PopError::Configuration(format!("wavelength index {wavelength} out of range"))
        })?;
        let fields = self.fields();
        let (sagittal, tangential) = fields.get(field).ok_or_else(|| {
            PopError::Configuration(format!("field index {field} out of range"))
        })?;
        RunParameters::new(
            micrometer!(*wl),
            self.pupil_diameter()?,
            self.general.grid_size,
            self.general.zoom,
        )?
        .with_field_angles(*sagittal, *tangential)?
        .with_ambient(self.general.temperature, self.general.pressure)?
        .with_rayleigh_factor(self.general.rayleigh_factor)
    }
    /// Build the optical chain for the given wavelength index.
    ///
    /// # Errors
    ///
    /// This function will return an error if the run parameters are invalid or the chain cannot
    /// be built.
    pub fn build_chain(
        &self,
        wavelength: usize,
        materials: &dyn MaterialLookup,
    ) -> PopResult<OpticalChain> {
        let params = self.run_parameters(wavelength, 0)?;
        OpticalChain::build(&self.surfaces, &params, materials)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{meter, millimeter, refractive_index::GlassCatalog, surface::SurfaceKind};
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    use tempfile::NamedTempFile;

    const SYSTEM: &str = "
general:
  project: test
  grid_size: 64
  zoom: 4
wavelengths: [1.0, 2.0]
fields:
  - [0.0, 0.0]
  - [0.0, 0.5]
surfaces:
  - name: INIT
    type: INIT
    aperture:
      elliptical:
        half_widths: [0.004, 0.005]
  - name: lens
    type: Paraxial Lens
    focal_length: 1.0
    thickness: 1.0
    stop: true
  - name: image
    type: Standard
    save: true
";

    #[test]
    fn from_string() {
        let document = SystemDocument::from_string(SYSTEM).unwrap();
        assert_eq!(document.general().project, "test");
        assert_eq!(document.general().temperature, 20.0);
        assert_eq!(document.wavelengths(), vec![micrometer!(1.0), micrometer!(2.0)]);
        assert_eq!(document.fields().len(), 2);
        assert_eq!(document.surfaces().len(), 3);
        assert_eq!(document.surfaces()[1].kind().type_name(), "Paraxial Lens");
        assert_relative_eq!(
            document.pupil_diameter().unwrap().value,
            millimeter!(10.0).value
        );
        assert_matches!(
            SystemDocument::from_string("general: [1, 2]"),
            Err(PopError::File(_))
        );
        let no_wavelength = "
general:
  grid_size: 64
  zoom: 4
wavelengths: []
surfaces: []
";
        assert_matches!(
            SystemDocument::from_string(no_wavelength),
            Err(PopError::Configuration(_))
        );
    }
    #[test]
    fn from_file() {
        let result = SystemDocument::from_file(Path::new("./invalid_file_path/invalid_file.yaml"));
        assert!(result
            .unwrap_err()
            .to_string()
            .starts_with("File:cannot read file ./invalid_file_path/invalid_file.yaml"));
    }
    #[test]
    fn run_parameters() {
        let document = SystemDocument::from_string(SYSTEM).unwrap();
        let params = document.run_parameters(1, 1).unwrap();
        assert_eq!(params.wavelength(), micrometer!(2.0));
        assert_eq!(params.grid_size(), 64);
        assert_eq!(params.field_angles(), (0.0, 0.5));
        assert_eq!(params.rayleigh_factor(), 1.0);
        assert_matches!(
            document.run_parameters(2, 0),
            Err(PopError::Configuration(_))
        );
        assert_matches!(
            document.run_parameters(0, 2),
            Err(PopError::Configuration(_))
        );
    }
    #[test]
    fn explicit_pupil() {
        let mut general = GeneralParameters::new("explicit", 64, 4);
        general.pupil_diameter = Some(millimeter!(20.0));
        let document = SystemDocument::new(
            general,
            1.0,
            vec![SurfaceDescription::init(millimeter!(10.0)).unwrap()],
        );
        assert_eq!(document.pupil_diameter().unwrap(), millimeter!(20.0));
        let document = SystemDocument::new(
            GeneralParameters::new("none", 64, 4),
            1.0,
            vec![SurfaceDescription::new("lens", SurfaceKind::default())],
        );
        assert_matches!(
            document.pupil_diameter(),
            Err(PopError::Configuration(_))
        );
    }
    #[test]
    fn build_chain() {
        let document = SystemDocument::from_string(SYSTEM).unwrap();
        let chain = document.build_chain(0, &GlassCatalog::default()).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.wavelength(), micrometer!(1.0));
        assert_relative_eq!(chain.effective_focal_length().unwrap(), 1.0);
    }
    #[test]
    fn save_to_file() {
        let mut document = SystemDocument::new(
            GeneralParameters::new("saved", 128, 8),
            0.6328,
            vec![SurfaceDescription::init(meter!(0.01)).unwrap()],
        );
        document.add_wavelength(1.064);
        document.add_field(0.1, 0.0);
        let file = NamedTempFile::new().unwrap();
        let path = file.into_temp_path();
        document.save_to_file(&path).unwrap();
        let read = SystemDocument::from_file(&path).unwrap();
        assert_eq!(read, document);
        path.close().unwrap();
    }
    #[test]
    fn rayleigh_factor_reaches_the_wavefront() {
        let system = SYSTEM.replace("  zoom: 4\n", "  zoom: 4\n  rayleigh_factor: 2.0\n");
        let document = SystemDocument::from_string(&system).unwrap();
        assert_eq!(document.general().rayleigh_factor, 2.0);
        let params = document.run_parameters(0, 0).unwrap();
        assert_eq!(params.rayleigh_factor(), 2.0);
        let wavefront = crate::wavefront::Wavefront::from_parameters(&params).unwrap();
        assert_eq!(wavefront.rayleigh_factor(), 2.0);
        let system = SYSTEM.replace("  zoom: 4\n", "  zoom: 4\n  rayleigh_factor: -1.0\n");
        let document = SystemDocument::from_string(&system).unwrap();
        assert_matches!(
            document.run_parameters(0, 0),
            Err(PopError::Configuration(_))
        );
    }
}
