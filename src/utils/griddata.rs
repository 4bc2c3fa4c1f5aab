//! Module for gridding data

#![warn(missing_docs)]
use crate::error::{PopError, PopResult};
use nalgebra::{DMatrix, DVector};

use super::usize_to_f64;

/// Regular sampling of the transverse plane of a wavefront.
///
/// Pixel `i` along an axis with `n` samples and pitch `d` is located at `(i - n/2) * d`, so
/// that for even `n` the optical axis hits the pixel `n/2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingGrid {
    nx: usize,
    ny: usize,
    dx: f64,
    dy: f64,
}

impl SamplingGrid {
    /// Create a new sampling grid.
    ///
    /// # Errors
    ///
    /// This function will return an error if the number of samples is zero or if one of the
    /// pitches is not a finite positive number.
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64) -> PopResult<Self> {
        if nx == 0 || ny == 0 {
            return Err(PopError::Configuration(
                "number of samples must be > 0".into(),
            ));
        }
        if !dx.is_normal() || !dx.is_sign_positive() || !dy.is_normal() || !dy.is_sign_positive()
        {
            return Err(PopError::Configuration(
                "sampling pitch must be positive and finite".into(),
            ));
        }
        Ok(Self { nx, ny, dx, dy })
    }
    /// Number of samples along x (columns).
    #[must_use]
    pub const fn nx(&self) -> usize {
        self.nx
    }
    /// Number of samples along y (rows).
    #[must_use]
    pub const fn ny(&self) -> usize {
        self.ny
    }
    /// Sampling pitch along x in meter.
    #[must_use]
    pub const fn dx(&self) -> f64 {
        self.dx
    }
    /// Sampling pitch along y in meter.
    #[must_use]
    pub const fn dy(&self) -> f64 {
        self.dy
    }
    /// x coordinates of the pixel columns.
    #[must_use]
    pub fn x_coordinates(&self) -> DVector<f64> {
        centered_axis(self.nx, self.dx)
    }
    /// y coordinates of the pixel rows.
    #[must_use]
    pub fn y_coordinates(&self) -> DVector<f64> {
        centered_axis(self.ny, self.dy)
    }
    /// Full x & y coordinate matrices of the grid.
    ///
    /// # Errors
    ///
    /// see [`meshgrid`]
    pub fn meshgrid(&self) -> PopResult<(DMatrix<f64>, DMatrix<f64>)> {
        meshgrid(&self.x_coordinates(), &self.y_coordinates())
    }
}

fn centered_axis(n: usize, d: f64) -> DVector<f64> {
    let half = usize_to_f64(n / 2);
    DVector::from_fn(n, |i, _| (usize_to_f64(i) - half) * d)
}

/// Creates two matrices from two vectors.
///
/// The first matrix repeats the x vector along its rows, the second one repeats the y vector
/// along its columns.
///
/// # Errors
///
/// This function will return an error if one of the input vectors is empty.
pub fn meshgrid(x: &DVector<f64>, y: &DVector<f64>) -> PopResult<(DMatrix<f64>, DMatrix<f64>)> {
    let x_len = x.len();
    let y_len = y.len();

    if x_len == 0 || y_len == 0 {
        Err(PopError::Other(
            "Input vectors must have a non-zero length!".into(),
        ))
    } else {
        let x_mat = DMatrix::<f64>::from_fn(y_len, x_len, |_, x_id| x[x_id]);
        let y_mat = DMatrix::<f64>::from_fn(y_len, x_len, |y_id, _| y[y_id]);
        Ok((x_mat, y_mat))
    }
}

/// Bilinear interpolation of gridded data at fractional pixel indices.
///
/// `col` and `row` are fractional indices into `data`. Returns `None` if the point lies outside
/// the convex hull of the sample centers.
#[must_use]
pub fn bilinear_interpolate(data: &DMatrix<f64>, col: f64, row: f64) -> Option<f64> {
    let (nrows, ncols) = data.shape();
    if nrows == 0 || ncols == 0 || !col.is_finite() || !row.is_finite() {
        return None;
    }
    let max_col = usize_to_f64(ncols - 1);
    let max_row = usize_to_f64(nrows - 1);
    if col < 0.0 || row < 0.0 || col > max_col || row > max_row {
        return None;
    }
    let c0 = super::f64_to_usize(col.floor());
    let r0 = super::f64_to_usize(row.floor());
    let c1 = (c0 + 1).min(ncols - 1);
    let r1 = (r0 + 1).min(nrows - 1);
    let tc = col - usize_to_f64(c0);
    let tr = row - usize_to_f64(r0);
    let top = data[(r0, c0)].mul_add(1.0 - tc, data[(r0, c1)] * tc);
    let bottom = data[(r1, c0)].mul_add(1.0 - tc, data[(r1, c1)] * tc);
    Some(top.mul_add(1.0 - tr, bottom * tr))
}
