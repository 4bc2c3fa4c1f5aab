//! Externally measured or simulated sag maps.
//!
//! A sag map is a regular grid of surface height errors. Row `i` of the map lies at
//! `y = (i - (ny - 1)/2) * pixel_size + y_decenter` (first row at the smallest y), column `j` at
//! `x = (j - (nx - 1)/2) * pixel_size + x_decenter`. The map is resampled bilinearly onto the
//! simulation grid. Outside the footprint of the map the surface is undefined.
use std::{
    fs::File,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, Trim};
use log::debug;
use nalgebra::DMatrix;
use num::Zero;
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

use super::{Aberration, AberrationMap};
use crate::{
    aperture::Aperture,
    error::{PopError, PopResult},
    utils::{
        griddata::{bilinear_interpolate, SamplingGrid},
        usize_to_f64,
    },
};

/// Location of the sag data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagSource {
    /// comma separated file, one map row per line
    File(PathBuf),
    /// rows given directly
    Inline(Vec<Vec<f64>>),
}

fn unit_length() -> Length {
    Length::new::<meter>(1.0)
}
fn zero_length() -> Length {
    Length::zero()
}
const fn default_path_factor() -> f64 {
    2.0
}

/// A surface whose error is given as a gridded sag map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSagSurface {
    source: SagSource,
    pixel_size: Length,
    #[serde(default = "zero_length")]
    x_decenter: Length,
    #[serde(default = "zero_length")]
    y_decenter: Length,
    #[serde(default = "unit_length")]
    unit: Length,
    /// conversion of sag into optical path difference
    #[serde(default = "default_path_factor")]
    path_factor: f64,
    #[serde(default)]
    support: Option<Aperture>,
}

impl GridSagSurface {
    /// Create a new grid sag surface.
    ///
    /// The optical path factor defaults to 2 (mirror in vacuum).
    ///
    /// # Errors
    ///
    /// This function will return an error if the pixel size is not positive and finite.
    pub fn new(source: SagSource, pixel_size: Length) -> PopResult<Self> {
        let surface = Self {
            source,
            pixel_size,
            x_decenter: Length::zero(),
            y_decenter: Length::zero(),
            unit: unit_length(),
            path_factor: default_path_factor(),
            support: None,
        };
        surface.validate()?;
        Ok(surface)
    }
    /// Check the parameters of this surface (the map itself is only read when sampled).
    ///
    /// # Errors
    ///
    /// This function will return an error if the pixel size is not positive or a parameter is
    /// not finite.
    pub fn validate(&self) -> PopResult<()> {
        if !self.pixel_size.is_normal() || !self.pixel_size.is_sign_positive() {
            return Err(PopError::Configuration(
                "grid sag pixel size must be positive".into(),
            ));
        }
        if !self.x_decenter.is_finite()
            || !self.y_decenter.is_finite()
            || !self.unit.is_finite()
            || !self.path_factor.is_finite()
        {
            return Err(PopError::Configuration(
                "grid sag parameters must be finite".into(),
            ));
        }
        Ok(())
    }
    /// Shift the map in the surface plane.
    ///
    /// # Errors
    ///
    /// This function will return an error if the decenter is not finite.
    pub fn with_decenter(mut self, x: Length, y: Length) -> PopResult<Self> {
        self.x_decenter = x;
        self.y_decenter = y;
        self.validate()?;
        Ok(self)
    }
    /// Set the unit of the sag values.
    ///
    /// # Errors
    ///
    /// This function will return an error if the unit is not finite.
    pub fn with_unit(mut self, unit: Length) -> PopResult<Self> {
        self.unit = unit;
        self.validate()?;
        Ok(self)
    }
    /// Set the factor converting sag into wavefront error (e.g. `|n2 - n1|` for a refracting
    /// surface).
    ///
    /// # Errors
    ///
    /// This function will return an error if the factor is not finite.
    pub fn with_path_factor(mut self, path_factor: f64) -> PopResult<Self> {
        self.path_factor = path_factor;
        self.validate()?;
        Ok(self)
    }
    /// Restrict the support to the given aperture.
    #[must_use]
    pub fn with_support(mut self, support: Aperture) -> Self {
        self.support = Some(support);
        self
    }
    /// Interpret a relative sag file path as relative to the given directory.
    #[must_use]
    pub fn relative_to(mut self, directory: &Path) -> Self {
        if let SagSource::File(path) = &self.source {
            if path.is_relative() {
                self.source = SagSource::File(directory.join(path));
            }
        }
        self
    }
    /// Returns the sag source.
    #[must_use]
    pub const fn source(&self) -> &SagSource {
        &self.source
    }
    /// Returns the optical path factor.
    #[must_use]
    pub const fn path_factor(&self) -> f64 {
        self.path_factor
    }
    /// Read the sag map (in units of [`GridSagSurface::with_unit`]).
    ///
    /// # Errors
    ///
    /// This function will return a [`PopError::File`] if the file cannot be read or the map is
    /// empty, ragged or contains non-numeric / non-finite values.
    pub fn load(&self) -> PopResult<DMatrix<f64>> {
        let rows = match &self.source {
            SagSource::Inline(rows) => rows.clone(),
            SagSource::File(path) => read_csv(path)?,
        };
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        if nrows == 0 || ncols == 0 {
            return Err(PopError::File("sag map is empty".into()));
        }
        if rows.iter().any(|r| r.len() != ncols) {
            return Err(PopError::File("sag map rows differ in length".into()));
        }
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(PopError::File(
                "sag map contains non-finite values".into(),
            ));
        }
        Ok(DMatrix::from_fn(nrows, ncols, |r, c| rows[r][c]))
    }
}

fn read_csv(path: &Path) -> PopResult<Vec<Vec<f64>>> {
    let file = File::open(path)
        .map_err(|e| PopError::File(format!("cannot open sag map {}: {e}", path.display())))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(file);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| PopError::File(e.to_string()))?;
        let row = record
            .iter()
            .filter(|field| !field.is_empty())
            .map(|field| {
                field.parse::<f64>().map_err(|e| {
                    PopError::File(format!("invalid sag value '{field}' in {}: {e}", path.display()))
                })
            })
            .collect::<PopResult<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

impl Aberration for GridSagSurface {
    fn wavefront_error(&self, grid: &SamplingGrid, _beam_radius: f64) -> PopResult<AberrationMap> {
        self.validate()?;
        let sag = self.load()?;
        let pixel = self.pixel_size.get::<meter>();
        let col_center = usize_to_f64(sag.ncols() - 1) / 2.0;
        let row_center = usize_to_f64(sag.nrows() - 1) / 2.0;
        let x_dec = self.x_decenter.get::<meter>();
        let y_dec = self.y_decenter.get::<meter>();
        let scale = self.unit.get::<meter>() * self.path_factor;
        let x = grid.x_coordinates();
        let y = grid.y_coordinates();
        let samples = DMatrix::from_fn(grid.ny(), grid.nx(), |row, col| {
            bilinear_interpolate(
                &sag,
                (x[col] - x_dec) / pixel + col_center,
                (y[row] - y_dec) / pixel + row_center,
            )
        });
        let mut support = samples.map(|s| s.is_some());
        if let Some(aperture) = &self.support {
            support = support.zip_map(&aperture.support(grid), |a, b| a && b);
        }
        let wfe = samples.map(|s| s.map_or(0.0, |v| v * scale));
        debug!(
            "grid sag map {}x{} resampled onto {}x{} grid",
            sag.ncols(),
            sag.nrows(),
            grid.nx(),
            grid.ny()
        );
        AberrationMap::new(wfe, support)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{aperture::EllipseConfig, meter, millimeter};
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ramp() -> SagSource {
        // 3 x 3 map, value = x index
        SagSource::Inline(vec![vec![0.0, 1.0, 2.0]; 3])
    }
    #[test]
    fn validation() {
        assert!(GridSagSurface::new(ramp(), meter!(0.0)).is_err());
        assert!(GridSagSurface::new(ramp(), meter!(-1.0)).is_err());
        let s = GridSagSurface::new(ramp(), meter!(1.0)).unwrap();
        assert_eq!(s.path_factor(), 2.0);
        assert!(s.clone().with_path_factor(f64::NAN).is_err());
        assert!(s.with_decenter(meter!(f64::INFINITY), meter!(0.0)).is_err());
    }
    #[test]
    fn load_inline() {
        let s = GridSagSurface::new(ramp(), meter!(1.0)).unwrap();
        let map = s.load().unwrap();
        assert_eq!(map.shape(), (3, 3));
        assert_eq!(map[(1, 2)], 2.0);
        let ragged = GridSagSurface::new(
            SagSource::Inline(vec![vec![1.0, 2.0], vec![1.0]]),
            meter!(1.0),
        )
        .unwrap();
        assert_matches!(ragged.load(), Err(PopError::File(_)));
        let empty = GridSagSurface::new(SagSource::Inline(vec![]), meter!(1.0)).unwrap();
        assert_matches!(empty.load(), Err(PopError::File(_)));
    }
    #[test]
    fn load_csv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# sag in nm").unwrap();
        writeln!(file, "1.0, 2.0, 3.0").unwrap();
        writeln!(file, "4.0, 5.0, 6.0").unwrap();
        let s = GridSagSurface::new(SagSource::File(file.path().to_path_buf()), meter!(1.0))
            .unwrap();
        let map = s.load().unwrap();
        assert_eq!(map.shape(), (2, 3));
        assert_eq!(map[(1, 0)], 4.0);
    }
    #[test]
    fn load_csv_wrong() {
        let missing = GridSagSurface::new(
            SagSource::File(PathBuf::from("./no_such_sag_map.csv")),
            meter!(1.0),
        )
        .unwrap();
        assert_matches!(missing.load(), Err(PopError::File(_)));
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1.0, abc").unwrap();
        let s = GridSagSurface::new(SagSource::File(file.path().to_path_buf()), meter!(1.0))
            .unwrap();
        assert_matches!(s.load(), Err(PopError::File(_)));
        let grid = SamplingGrid::new(8, 8, 0.1, 0.1).unwrap();
        assert_matches!(s.wavefront_error(&grid, 1.0), Err(PopError::File(_)));
    }
    #[test]
    fn resampling() {
        let grid = SamplingGrid::new(8, 8, 0.5, 0.5).unwrap();
        let s = GridSagSurface::new(ramp(), meter!(1.0))
            .unwrap()
            .with_unit(millimeter!(1.0))
            .unwrap();
        let map = s.wavefront_error(&grid, 1.0).unwrap();
        // grid pixel 4 is on axis, i.e. the map center (value 1.0)
        assert_relative_eq!(map.wfe()[(4, 4)], 2.0e-3);
        assert_relative_eq!(map.wfe()[(4, 5)], 2.0 * 1.5e-3);
        assert!(map.support()[(2, 6)]);
        assert!(!map.support()[(4, 7)]);
        assert_eq!(map.wfe()[(4, 7)], 0.0);
    }
    #[test]
    fn decenter_and_support() {
        let grid = SamplingGrid::new(8, 8, 0.5, 0.5).unwrap();
        let s = GridSagSurface::new(ramp(), meter!(1.0))
            .unwrap()
            .with_decenter(meter!(1.0), meter!(0.0))
            .unwrap()
            .with_path_factor(1.0)
            .unwrap();
        let map = s.wavefront_error(&grid, 1.0).unwrap();
        assert_relative_eq!(map.wfe()[(4, 6)], 1.0);
        assert!(!map.support()[(4, 3)]);
        let masked = s.with_support(Aperture::Elliptical(
            EllipseConfig::circle(meter!(0.6)).unwrap(),
        ));
        let map = masked.wavefront_error(&grid, 1.0).unwrap();
        assert!(!map.support()[(4, 6)]);
        assert!(map.support()[(4, 5)]);
    }
    #[test]
    fn deserialize() {
        let s: GridSagSurface = serde_yaml::from_str(
            "source:\n  inline: [[0.0, 1.0], [2.0, 3.0]]\npixel_size: 0.001\nunit: 1.0e-9\n",
        )
        .unwrap();
        assert_eq!(s.path_factor(), 2.0);
        assert_eq!(s.load().unwrap()[(1, 0)], 2.0);
    }
}
