//! Two dimensional transforms of sampled complex fields.
//!
//! All transforms are unitary ("ortho" normalization), so that the total power of a field is
//! preserved by a forward or an inverse transform. Fields are stored as [`DMatrix`] with rows
//! along the y axis and columns along the x axis.
use nalgebra::{DMatrix, DVector, Scalar};
use num::{complex::Complex64, Zero};
use rustfft::{FftDirection, FftPlanner};

use super::usize_to_f64;

/// Perform an in-place two dimensional FFT of the given field in the given direction.
///
/// The result is scaled by `1/sqrt(nrows*ncols)`.
pub fn fft2(field: &mut DMatrix<Complex64>, direction: FftDirection) {
    let (nrows, ncols) = field.shape();
    if nrows == 0 || ncols == 0 {
        return;
    }
    let mut planner = FftPlanner::<f64>::new();
    // columns are contiguous in a column major matrix
    let col_fft = planner.plan_fft(nrows, direction);
    let mut scratch = vec![Complex64::zero(); col_fft.get_inplace_scratch_len()];
    for column in field.as_mut_slice().chunks_exact_mut(nrows) {
        col_fft.process_with_scratch(column, &mut scratch);
    }
    let row_fft = planner.plan_fft(ncols, direction);
    let mut scratch = vec![Complex64::zero(); row_fft.get_inplace_scratch_len()];
    if nrows == ncols {
        field.transpose_mut();
        for row in field.as_mut_slice().chunks_exact_mut(ncols) {
            row_fft.process_with_scratch(row, &mut scratch);
        }
        field.transpose_mut();
    } else {
        let mut transposed = field.transpose();
        for row in transposed.as_mut_slice().chunks_exact_mut(ncols) {
            row_fft.process_with_scratch(row, &mut scratch);
        }
        *field = transposed.transpose();
    }
    let norm = 1.0 / usize_to_f64(nrows * ncols).sqrt();
    field.apply(|c| *c *= norm);
}

/// Forward unitary FFT (in-place).
pub fn fft2_forward(field: &mut DMatrix<Complex64>) {
    fft2(field, FftDirection::Forward);
}
/// Inverse unitary FFT (in-place).
pub fn fft2_inverse(field: &mut DMatrix<Complex64>) {
    fft2(field, FftDirection::Inverse);
}

fn shift<T: Scalar>(matrix: &mut DMatrix<T>, row_offset: usize, col_offset: usize) {
    let (nrows, ncols) = matrix.shape();
    if nrows % 2 == 0 && ncols % 2 == 0 {
        // for even sizes the shift is a swap of diagonally opposite quadrants
        let (hr, hc) = (nrows / 2, ncols / 2);
        for col in 0..ncols {
            let other_col = (col + hc) % ncols;
            for row in 0..hr {
                matrix.swap((row, col), (row + hr, other_col));
            }
        }
    } else {
        let source = matrix.clone();
        *matrix = DMatrix::from_fn(nrows, ncols, |r, c| {
            source[((r + row_offset) % nrows, (c + col_offset) % ncols)].clone()
        });
    }
}

/// Move the zero frequency component from the first element to the center of the matrix (in-place).
///
/// Equivalent to `numpy.fft.fftshift`.
pub fn fftshift<T: Scalar>(matrix: &mut DMatrix<T>) {
    let (nrows, ncols) = matrix.shape();
    shift(matrix, nrows - nrows / 2, ncols - ncols / 2);
}

/// Inverse of [`fftshift`] (in-place).
///
/// Equivalent to `numpy.fft.ifftshift`.
pub fn ifftshift<T: Scalar>(matrix: &mut DMatrix<T>) {
    let (nrows, ncols) = matrix.shape();
    shift(matrix, nrows / 2, ncols / 2);
}

/// Sample frequencies of a discrete Fourier transform of length `n` with sample spacing `d`.
///
/// Equivalent to `numpy.fft.fftfreq`: `[0, 1, ..., n/2-1, -n/2, ..., -1] / (d*n)` for even `n`.
#[must_use]
pub fn fftfreq(n: usize, d: f64) -> DVector<f64> {
    let scale = 1.0 / (usize_to_f64(n) * d);
    let positive = n.div_ceil(2);
    DVector::from_fn(n, |i, _| {
        if i < positive {
            usize_to_f64(i) * scale
        } else {
            -usize_to_f64(n - i) * scale
        }
    })
}
