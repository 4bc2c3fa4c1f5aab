#![warn(missing_docs)]
//! Results of a propagation run.
use std::{fs, path::Path};

use nalgebra::DMatrix;
use num::complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::{
    abcd::Abcd,
    error::{PopError, PopResult},
    utils::math_utils::kahan_sum,
    wavefront::{PropagatorKind, Wavefront},
};

/// Snapshot of the wavefront at a saved surface.
///
/// The field is taken after aperture, stop and aberrations of the surface have been applied and
/// before its ray transfer matrices act on the beam. The cumulative matrices include the
/// surface.
#[derive(Debug, Clone)]
pub struct SurfaceOutput {
    index: usize,
    name: String,
    field: DMatrix<Complex64>,
    aperture: Option<DMatrix<f64>>,
    dx: f64,
    dy: f64,
    extent: (f64, f64, f64, f64),
    wavelength: f64,
    wz: f64,
    w0: f64,
    zr: f64,
    z: f64,
    distance_to_focus: f64,
    fratio: f64,
    propagator: Option<PropagatorKind>,
    sagittal: Abcd,
    tangential: Abcd,
}

impl SurfaceOutput {
    /// Take a snapshot of the given wavefront.
    #[must_use]
    pub fn new(
        index: usize,
        name: &str,
        wavefront: &Wavefront,
        aperture: Option<DMatrix<f64>>,
    ) -> Self {
        Self {
            index,
            name: name.to_owned(),
            field: wavefront.field().clone(),
            aperture,
            dx: wavefront.dx(),
            dy: wavefront.dy(),
            extent: wavefront.extent(),
            wavelength: wavefront.wavelength(),
            wz: wavefront.wz(),
            w0: wavefront.w0(),
            zr: wavefront.zr(),
            z: wavefront.z(),
            distance_to_focus: wavefront.distance_to_focus(),
            fratio: wavefront.fratio(),
            propagator: wavefront.last_propagator(),
            sagittal: Abcd::default(),
            tangential: Abcd::default(),
        }
    }
    pub(crate) fn set_cumulative(&mut self, sagittal: Abcd, tangential: Abcd) {
        self.sagittal = sagittal;
        self.tangential = tangential;
    }
    /// Index of the surface in the surface list.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
    /// Name of the surface.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    /// The complex field.
    #[must_use]
    pub const fn field(&self) -> &DMatrix<Complex64> {
        &self.field
    }
    /// Transmission mask of the aperture applied at this surface (if any).
    #[must_use]
    pub const fn aperture(&self) -> Option<&DMatrix<f64>> {
        self.aperture.as_ref()
    }
    /// Field amplitude.
    #[must_use]
    pub fn amplitude(&self) -> DMatrix<f64> {
        self.field.map(|c| c.norm())
    }
    /// Field phase (rad).
    #[must_use]
    pub fn phase(&self) -> DMatrix<f64> {
        self.field.map(|c| c.arg())
    }
    /// Field intensity.
    #[must_use]
    pub fn intensity(&self) -> DMatrix<f64> {
        self.field.map(|c| c.norm_sqr())
    }
    /// Sum of the intensity over the grid.
    #[must_use]
    pub fn total_power(&self) -> f64 {
        kahan_sum(self.field.iter().map(|c| c.norm_sqr()))
    }
    /// Sampling pitch `(dx, dy)`.
    #[must_use]
    pub const fn sampling(&self) -> (f64, f64) {
        (self.dx, self.dy)
    }
    /// Physical extent `(xmin, xmax, ymin, ymax)` of the pixel centers.
    #[must_use]
    pub const fn extent(&self) -> (f64, f64, f64, f64) {
        self.extent
    }
    /// Wavelength in the medium at this surface.
    #[must_use]
    pub const fn wavelength(&self) -> f64 {
        self.wavelength
    }
    /// Pilot beam radius.
    #[must_use]
    pub const fn wz(&self) -> f64 {
        self.wz
    }
    /// Pilot beam waist radius.
    #[must_use]
    pub const fn w0(&self) -> f64 {
        self.w0
    }
    /// Rayleigh distance of the pilot beam.
    #[must_use]
    pub const fn zr(&self) -> f64 {
        self.zr
    }
    /// Position along the optical axis.
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.z
    }
    /// Signed distance to the pilot beam waist.
    #[must_use]
    pub const fn distance_to_focus(&self) -> f64 {
        self.distance_to_focus
    }
    /// Focal ratio of the beam.
    #[must_use]
    pub const fn fratio(&self) -> f64 {
        self.fratio
    }
    /// Propagator used to reach this surface (`None` if no propagation took place yet).
    #[must_use]
    pub const fn propagator(&self) -> Option<PropagatorKind> {
        self.propagator
    }
    /// Cumulative sagittal and tangential matrices up to and including this surface.
    #[must_use]
    pub const fn cumulative_abcd(&self) -> (&Abcd, &Abcd) {
        (&self.sagittal, &self.tangential)
    }
    /// Scalar diagnostics of this surface.
    #[must_use]
    pub fn summary(&self) -> SurfaceSummary {
        SurfaceSummary {
            index: self.index,
            name: self.name.clone(),
            dx: self.dx,
            dy: self.dy,
            extent: self.extent,
            wavelength: self.wavelength,
            wz: self.wz,
            w0: self.w0,
            zr: self.zr,
            distance_to_focus: self.distance_to_focus,
            fratio: self.fratio,
            total_power: self.total_power(),
            propagator: self.propagator.map(|p| p.to_string()),
            sagittal_focal_length: self.sagittal.focal_length().ok(),
            tangential_focal_length: self.tangential.focal_length().ok(),
        }
    }
}

/// Serializable scalar diagnostics of a [`SurfaceOutput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSummary {
    /// surface index
    pub index: usize,
    /// surface name
    pub name: String,
    /// sampling pitch along x (m)
    pub dx: f64,
    /// sampling pitch along y (m)
    pub dy: f64,
    /// `(xmin, xmax, ymin, ymax)` in m
    pub extent: (f64, f64, f64, f64),
    /// wavelength in the medium (m)
    pub wavelength: f64,
    /// pilot beam radius (m)
    pub wz: f64,
    /// pilot beam waist (m)
    pub w0: f64,
    /// Rayleigh distance (m)
    pub zr: f64,
    /// distance to the pilot beam waist (m)
    pub distance_to_focus: f64,
    /// focal ratio
    pub fratio: f64,
    /// total power
    pub total_power: f64,
    /// propagator label (II, IO, OI, OO)
    pub propagator: Option<String>,
    /// effective focal length of the system up to this surface, sagittal
    pub sagittal_focal_length: Option<f64>,
    /// effective focal length of the system up to this surface, tangential
    pub tangential_focal_length: Option<f64>,
}

/// Scalar diagnostics of one propagation run (wavelength and field).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// wavelength (m)
    pub wavelength: f64,
    /// `(sagittal, tangential)` field angles (degrees)
    pub field: (f64, f64),
    /// diagnostics of the saved surfaces
    pub surfaces: Vec<SurfaceSummary>,
}

impl RunSummary {
    /// Summarize the given propagation result.
    #[must_use]
    pub fn new(wavelength: f64, field: (f64, f64), result: &PropagationResult) -> Self {
        Self {
            wavelength,
            field,
            surfaces: result.summaries(),
        }
    }
}

/// Write the given run summaries as YAML into a file.
///
/// # Errors
///
/// This function will return an error if the file cannot be created or written.
pub fn save_summaries(summaries: &[RunSummary], path: &Path) -> PopResult<()> {
    let serialized = serde_yaml::to_string(summaries)
        .map_err(|e| PopError::Other(format!("serialization of summary failed: {e}")))?;
    fs::write(path, serialized).map_err(|e| {
        PopError::File(format!(
            "writing to file path {} failed: {}",
            path.display(),
            e
        ))
    })
}

/// Result of the propagation of one wavelength and field through an optical chain.
#[derive(Debug, Clone, Default)]
pub struct PropagationResult {
    outputs: Vec<SurfaceOutput>,
}

impl PropagationResult {
    pub(crate) fn push(&mut self, output: SurfaceOutput) {
        self.outputs.push(output);
    }
    /// Outputs of the saved surfaces in chain order.
    #[must_use]
    pub fn outputs(&self) -> &[SurfaceOutput] {
        &self.outputs
    }
    /// Output of the surface with the given index (if saved).
    #[must_use]
    pub fn surface(&self, index: usize) -> Option<&SurfaceOutput> {
        self.outputs.iter().find(|o| o.index == index)
    }
    /// Output of the last saved surface.
    #[must_use]
    pub fn last(&self) -> Option<&SurfaceOutput> {
        self.outputs.last()
    }
    /// Number of saved surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }
    /// Returns `true` if no surface was saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
    /// Scalar diagnostics of all saved surfaces.
    #[must_use]
    pub fn summaries(&self) -> Vec<SurfaceSummary> {
        self.outputs.iter().map(SurfaceOutput::summary).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::meter;
    use approx::assert_relative_eq;
    #[test]
    fn snapshot() {
        let mut wf = Wavefront::new(meter!(0.01), meter!(1.0e-6), 64, 4).unwrap();
        wf.make_stop().unwrap();
        let mut out = SurfaceOutput::new(3, "stop", &wf, None);
        assert_eq!(out.index(), 3);
        assert_eq!(out.name(), "stop");
        assert_relative_eq!(out.total_power(), 1.0);
        assert_eq!(out.sampling(), (wf.dx(), wf.dy()));
        assert_eq!(out.extent(), wf.extent());
        assert_eq!(out.propagator(), None);
        assert!(out.aperture().is_none());
        assert_eq!(out.amplitude().shape(), (64, 64));
        assert_relative_eq!(out.intensity()[(0, 0)], 1.0 / 4096.0);
        assert_eq!(out.phase()[(10, 10)], 0.0);
        let lens = Abcd::thin_lens(2.0).unwrap();
        out.set_cumulative(lens, Abcd::default());
        let summary = out.summary();
        assert_relative_eq!(summary.sagittal_focal_length.unwrap(), 2.0);
        assert!(summary.tangential_focal_length.unwrap().is_infinite());
        assert_eq!(summary.propagator, None);
        assert_relative_eq!(summary.total_power, 1.0);
    }
    #[test]
    fn result() {
        let wf = Wavefront::new(meter!(0.01), meter!(1.0e-6), 64, 4).unwrap();
        let mut result = PropagationResult::default();
        assert!(result.is_empty());
        result.push(SurfaceOutput::new(1, "a", &wf, None));
        result.push(SurfaceOutput::new(4, "b", &wf, None));
        assert_eq!(result.len(), 2);
        assert_eq!(result.surface(4).unwrap().name(), "b");
        assert!(result.surface(2).is_none());
        assert_eq!(result.last().unwrap().index(), 4);
        let yaml = serde_yaml::to_string(&result.summaries()).unwrap();
        assert!(yaml.contains("name: a"));
    }
    #[test]
    fn save_run_summaries() {
        let wf = Wavefront::new(meter!(0.01), meter!(1.0e-6), 64, 4).unwrap();
        let mut result = PropagationResult::default();
        result.push(SurfaceOutput::new(2, "image", &wf, None));
        let summary = RunSummary::new(1.0e-6, (0.0, 0.5), &result);
        assert_eq!(summary.surfaces.len(), 1);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.yaml");
        save_summaries(&[summary.clone()], &path).unwrap();
        let read: Vec<RunSummary> =
            serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read[0].field, summary.field);
        assert_eq!(read[0].surfaces[0].name, "image");
        assert!(save_summaries(&[summary], &dir.path().join("no/dir.yaml")).is_err());
    }
}
